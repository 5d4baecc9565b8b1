use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        billing::{BillingUseCases, PlanRepo, SignupIntentRepo, TenantBillingRepo},
        webhook_processing::{ProcessedEventRepo, WebhookUseCases},
    },
    application::webhook_ingress::SignatureVerifier,
    infra::{
        config::AppConfig, mercadopago_client::MercadoPagoClient, postgres_persistence,
        rate_limit::RedisRateLimiter,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
        )
        .await?,
    );

    let gateway = Arc::new(MercadoPagoClient::new(
        config.gateway_base_url.clone(),
        config.gateway_access_token.clone(),
        Duration::from_secs(config.gateway_timeout_secs),
    )?);

    let tenant_billing_repo = postgres_arc.clone() as Arc<dyn TenantBillingRepo>;
    let plan_repo = postgres_arc.clone() as Arc<dyn PlanRepo>;
    let intent_repo = postgres_arc.clone() as Arc<dyn SignupIntentRepo>;
    let event_repo = postgres_arc.clone() as Arc<dyn ProcessedEventRepo>;

    let billing_use_cases = BillingUseCases::new(
        tenant_billing_repo.clone(),
        plan_repo.clone(),
        intent_repo.clone(),
        gateway.clone(),
    );

    let webhook_use_cases = WebhookUseCases::new(
        event_repo,
        tenant_billing_repo,
        plan_repo,
        intent_repo,
        gateway,
    );

    let signature_verifier = SignatureVerifier::new(config.webhook_secret.clone());

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
        webhook_use_cases: Arc::new(webhook_use_cases),
        signature_verifier: Arc::new(signature_verifier),
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taller_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
