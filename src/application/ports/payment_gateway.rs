use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app_error::AppResult;

/// Gateway-neutral view of a recurring-billing agreement (the processor's
/// "preapproval" resource).
#[derive(Debug, Clone)]
pub struct Preapproval {
    pub id: String,
    /// Raw gateway status string; mapped locally via
    /// `SubscriptionStatus::from_gateway`.
    pub status: String,
    pub external_reference: Option<String>,
    pub payer_email: Option<String>,
    pub preapproval_plan_id: Option<String>,
    pub next_payment_date: Option<DateTime<Utc>>,
    /// Hosted checkout URL, when the gateway wants the payer redirected.
    pub init_point: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePreapproval {
    pub preapproval_plan_id: String,
    pub payer_email: String,
    pub back_url: String,
    pub card_token_id: Option<String>,
    pub external_reference: String,
}

/// Payment gateway port. Three operations are all this system consumes:
/// create, authoritative read, cancel. Implementations map transport and
/// 5xx failures to `AppError::Upstream` (retryable) and a missing resource
/// to `AppError::NotFound`.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    async fn create_preapproval(&self, input: &CreatePreapproval) -> AppResult<Preapproval>;

    /// Source-of-truth fetch. Reconciliation always goes through this
    /// instead of trusting webhook payload fields.
    async fn get_preapproval(&self, id: &str) -> AppResult<Preapproval>;

    async fn cancel_preapproval(&self, id: &str) -> AppResult<Preapproval>;
}
