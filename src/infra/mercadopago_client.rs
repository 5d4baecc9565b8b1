use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{CreatePreapproval, PaymentGatewayPort, Preapproval},
};

#[derive(Clone)]
pub struct MercadoPagoClient {
    client: Client,
    base_url: Url,
    access_token: SecretString,
}

impl MercadoPagoClient {
    pub fn new(base_url: Url, access_token: SecretString, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("failed to read gateway response: {e}")))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if status.is_server_error() {
            tracing::error!(status = %status, body = %body, "Gateway server error");
            return Err(AppError::Upstream(format!("gateway answered {status}")));
        }
        if !status.is_success() {
            // The gateway's error body may carry payer details; log it
            // internally, never hand it back to callers.
            tracing::error!(status = %status, body = %body, "Gateway rejected request");
            return Err(AppError::InvalidInput(
                "payment gateway rejected the request".into(),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse gateway response");
            AppError::Upstream(format!("unparseable gateway response: {e}"))
        })
    }
}

#[async_trait]
impl PaymentGatewayPort for MercadoPagoClient {
    async fn create_preapproval(&self, input: &CreatePreapproval) -> AppResult<Preapproval> {
        let mut body = json!({
            "preapproval_plan_id": input.preapproval_plan_id,
            "payer_email": input.payer_email,
            "back_url": input.back_url,
            "external_reference": input.external_reference,
            "status": "pending",
        });
        if let Some(token) = &input.card_token_id {
            body["card_token_id"] = json!(token);
        }

        let response = self
            .client
            .post(self.url("/preapproval"))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("gateway request failed: {e}")))?;

        let resource: PreapprovalResource = self.handle_response(response).await?;
        Ok(resource.into())
    }

    async fn get_preapproval(&self, id: &str) -> AppResult<Preapproval> {
        let response = self
            .client
            .get(self.url(&format!("/preapproval/{id}")))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("gateway request failed: {e}")))?;

        let resource: PreapprovalResource = self.handle_response(response).await?;
        Ok(resource.into())
    }

    async fn cancel_preapproval(&self, id: &str) -> AppResult<Preapproval> {
        let response = self
            .client
            .put(self.url(&format!("/preapproval/{id}")))
            .header("Authorization", self.auth_header())
            .json(&json!({"status": "cancelled"}))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("gateway request failed: {e}")))?;

        let resource: PreapprovalResource = self.handle_response(response).await?;
        Ok(resource.into())
    }
}

// ============================================================================
// Gateway Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct PreapprovalResource {
    id: String,
    status: String,
    external_reference: Option<String>,
    payer_email: Option<String>,
    preapproval_plan_id: Option<String>,
    next_payment_date: Option<DateTime<Utc>>,
    init_point: Option<String>,
}

impl From<PreapprovalResource> for Preapproval {
    fn from(r: PreapprovalResource) -> Self {
        Preapproval {
            id: r.id,
            status: r.status,
            external_reference: r.external_reference,
            payer_email: r.payer_email,
            preapproval_plan_id: r.preapproval_plan_id,
            next_payment_date: r.next_payment_date,
            init_point: r.init_point,
        }
    }
}
