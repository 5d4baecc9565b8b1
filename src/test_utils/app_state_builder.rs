//! Builder for a fully wired `AppState` over in-memory mocks.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{billing::BillingUseCases, webhook_processing::WebhookUseCases},
    application::webhook_ingress::SignatureVerifier,
    domain::entities::{subscription_plan::Plan, tenant_billing::TenantBillingState},
    infra::config::AppConfig,
    test_utils::{
        billing_mocks::{
            InMemoryPlanRepo, InMemoryProcessedEventRepo, InMemorySignupIntentRepo,
            InMemoryTenantBillingRepo, NoopRateLimiter,
        },
        gateway_mocks::MockGateway,
    },
};

pub struct TestAppStateBuilder {
    pub tenants: Arc<InMemoryTenantBillingRepo>,
    pub plans: Arc<InMemoryPlanRepo>,
    pub intents: Arc<InMemorySignupIntentRepo>,
    pub events: Arc<InMemoryProcessedEventRepo>,
    pub gateway: Arc<MockGateway>,
    webhook_secret: Option<String>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        let events = Arc::new(InMemoryProcessedEventRepo::new());
        let tenants = Arc::new(InMemoryTenantBillingRepo::new());
        let intents = Arc::new(InMemorySignupIntentRepo::new());
        tenants.link_events(events.clone());
        intents.link_events(events.clone());
        Self {
            tenants,
            plans: Arc::new(InMemoryPlanRepo::new()),
            intents,
            events,
            gateway: Arc::new(MockGateway::new()),
            webhook_secret: None,
        }
    }

    pub fn with_billing_state(self, state: TenantBillingState) -> Self {
        self.tenants.insert(state);
        self
    }

    pub fn with_plan(self, plan: Plan) -> Self {
        self.plans.insert(plan);
        self
    }

    pub fn with_webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_string());
        self
    }

    pub fn build(self) -> AppState {
        let billing_use_cases = BillingUseCases::new(
            self.tenants.clone(),
            self.plans.clone(),
            self.intents.clone(),
            self.gateway.clone(),
        );
        let webhook_use_cases = WebhookUseCases::new(
            self.events.clone(),
            self.tenants.clone(),
            self.plans.clone(),
            self.intents.clone(),
            self.gateway.clone(),
        );
        let signature_verifier = SignatureVerifier::new(
            self.webhook_secret
                .map(|s| SecretString::new(s.into())),
        );

        AppState {
            config: Arc::new(test_config()),
            billing_use_cases: Arc::new(billing_use_cases),
            webhook_use_cases: Arc::new(webhook_use_cases),
            signature_verifier: Arc::new(signature_verifier),
            rate_limiter: Arc::new(NoopRateLimiter),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://localhost/test".to_string(),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        jwt_secret: SecretString::new("test-jwt-secret".into()),
        session_ttl: Duration::hours(1),
        gateway_base_url: "https://gateway.test".parse().unwrap(),
        gateway_access_token: SecretString::new("test-access-token".into()),
        webhook_secret: None,
        gateway_timeout_secs: 1,
        trial_days: 14,
        rate_limit_window_secs: 60,
        rate_limit_per_ip: 1_000,
        pending_sweep_interval_secs: 300,
        pending_sweep_threshold_mins: 60,
    }
}
