//! Gateway webhook ingress: payload extraction, deterministic event ids and
//! signature verification.
//!
//! The gateway does not guarantee a stable notification schema across event
//! types (several historical shapes are still in the wild), so topic and
//! resource id are extracted by an ordered list of strategies over the JSON
//! body and the query string; the first match wins.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::app_error::{AppError, AppResult};

/// Normalized view of an inbound notification.
#[derive(Debug, Clone)]
pub struct WebhookNotification {
    pub topic: String,
    pub resource_id: String,
    pub request_id: Option<String>,
}

type Extract = fn(&Value, &HashMap<String, String>) -> Option<String>;

const TOPIC_STRATEGIES: &[Extract] = &[
    |body, _| body["topic"].as_str().map(str::to_string),
    |body, _| body["type"].as_str().map(str::to_string),
    |_, query| query.get("topic").cloned(),
    |_, query| query.get("type").cloned(),
];

const RESOURCE_ID_STRATEGIES: &[Extract] = &[
    |body, _| json_id(&body["data"]["id"]),
    |body, _| json_id(&body["id"]),
    |_, query| query.get("id").cloned(),
    |_, query| query.get("data.id").cloned(),
    |body, _| {
        // Oldest shape: a `resource` URL whose last path segment is the id.
        body["resource"]
            .as_str()
            .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    },
];

fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn extract_first(strategies: &[Extract], body: &Value, query: &HashMap<String, String>) -> Option<String> {
    strategies.iter().find_map(|s| s(body, query))
}

/// Extract a normalized notification, or `None` for traffic we cannot make
/// sense of (the HTTP layer acks those so the gateway stops retrying).
pub fn parse_notification(
    body: &Value,
    query: &HashMap<String, String>,
    request_id: Option<&str>,
) -> Option<WebhookNotification> {
    let topic = extract_first(TOPIC_STRATEGIES, body, query)?;
    let resource_id = extract_first(RESOURCE_ID_STRATEGIES, body, query)?;
    Some(WebhookNotification {
        topic,
        resource_id,
        request_id: request_id.map(str::to_string),
    })
}

/// Deterministic event id for the idempotency ledger. The gateway supplies
/// no event id of its own, so re-deliveries must collide by construction:
/// the same correlation id, topic and resource id always hash identically.
pub fn event_id(request_id: Option<&str>, topic: &str, resource_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request_id.unwrap_or_default().as_bytes());
    hasher.update(b"\n");
    hasher.update(topic.as_bytes());
    hasher.update(b"\n");
    hasher.update(resource_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// HMAC verification of the `x-signature` header.
///
/// Without a configured secret every request is accepted (local/dev
/// deployments). With a secret the header must carry `ts=<unix>,v1=<hex>`
/// and the MAC must match the canonical manifest; anything missing or
/// malformed fails closed.
pub struct SignatureVerifier {
    secret: Option<SecretString>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<SecretString>) -> Self {
        Self { secret }
    }

    pub fn verify(
        &self,
        signature_header: Option<&str>,
        request_id: Option<&str>,
        resource_id: &str,
    ) -> AppResult<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };

        let header = signature_header.ok_or(AppError::Unauthorized)?;
        let request_id = request_id.ok_or(AppError::Unauthorized)?;

        let mut ts: Option<&str> = None;
        let mut v1: Option<&str> = None;
        for part in header.split(',') {
            let kv: Vec<&str> = part.splitn(2, '=').collect();
            if kv.len() != 2 {
                continue;
            }
            match kv[0].trim() {
                "ts" => ts = Some(kv[1].trim()),
                "v1" => v1 = Some(kv[1].trim()),
                _ => {}
            }
        }
        let (Some(ts), Some(v1)) = (ts, v1) else {
            return Err(AppError::Unauthorized);
        };

        let manifest = format!(
            "id:{};request-id:{};ts:{};",
            resource_id.to_lowercase(),
            request_id,
            ts
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| AppError::Internal("HMAC init failed".into()))?;
        mac.update(manifest.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if constant_time_compare(v1, &expected) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
