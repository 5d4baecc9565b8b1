use std::sync::Arc;

use crate::{
    application::use_cases::{billing::BillingUseCases, webhook_processing::WebhookUseCases},
    application::webhook_ingress::SignatureVerifier,
    infra::{config::AppConfig, rate_limit::RateLimiterTrait},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub webhook_use_cases: Arc<WebhookUseCases>,
    pub signature_verifier: Arc<SignatureVerifier>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}
