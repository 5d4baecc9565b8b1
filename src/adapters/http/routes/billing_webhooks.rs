//! Payment gateway webhook handler.
//!
//! Response-code policy decides redelivery: 200 acknowledges (including
//! unparseable and duplicate traffic), 401 only when signature verification
//! is configured and fails, 5xx only for transient processing failures so
//! the gateway retries.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde_json::Value;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::webhook_ingress::{event_id, parse_notification},
};

/// POST /api/webhooks/mercadopago
async fn handle_mercadopago_webhook(
    State(app_state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> AppResult<StatusCode> {
    let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok());
    let signature = headers.get("x-signature").and_then(|v| v.to_str().ok());

    // The body is processor-defined and not guaranteed to be JSON at all.
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let Some(notification) = parse_notification(&payload, &query, request_id) else {
        // Garbage traffic: acknowledge so the gateway stops retrying.
        tracing::debug!(body_len = body.len(), "Unparseable webhook, acknowledging");
        return Ok(StatusCode::OK);
    };

    app_state
        .signature_verifier
        .verify(signature, request_id, &notification.resource_id)?;

    let event_id = event_id(
        notification.request_id.as_deref(),
        &notification.topic,
        &notification.resource_id,
    );

    match app_state
        .webhook_use_cases
        .process(&notification, &event_id, &payload)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                event_id,
                topic = %notification.topic,
                resource_id = %notification.resource_id,
                outcome = ?outcome,
                "Webhook handled"
            );
            Ok(StatusCode::OK)
        }
        Err(e) if e.is_retryable() => {
            // Do not acknowledge: the gateway must redeliver.
            tracing::error!(
                event_id,
                error = %e,
                retryable = true,
                "Webhook processing failed, forcing redelivery"
            );
            Err(e)
        }
        Err(e) => {
            tracing::warn!(
                event_id,
                error = %e,
                retryable = false,
                "Webhook processing failed terminally, acknowledging"
            );
            Ok(StatusCode::OK)
        }
    }
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/mercadopago", post(handle_mercadopago_webhook))
}
