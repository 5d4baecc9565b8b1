use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub redis_url: String,
    pub cors_origin: HeaderValue,
    pub jwt_secret: SecretString,
    pub session_ttl: Duration,
    /// Payment gateway base URL. Overridable so tests and staging can point
    /// at a fake gateway.
    pub gateway_base_url: Url,
    pub gateway_access_token: SecretString,
    /// Shared webhook secret. Unset means signature verification is skipped
    /// entirely (accept-all) — intentional for local/dev deployments.
    pub webhook_secret: Option<SecretString>,
    pub gateway_timeout_secs: u64,
    pub trial_days: i64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub pending_sweep_interval_secs: u64,
    pub pending_sweep_threshold_mins: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let session_ttl_secs: i64 = get_env_default("SESSION_TTL_SECS", 86_400);

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let gateway_base_url: Url = get_env_default(
            "MP_BASE_URL",
            "https://api.mercadopago.com".parse().unwrap(),
        );
        let gateway_access_token: SecretString =
            SecretString::new(get_env::<String>("MP_ACCESS_TOKEN").into());
        let webhook_secret: Option<SecretString> = std::env::var("MP_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.into()));
        let gateway_timeout_secs: u64 = get_env_default("MP_TIMEOUT_SECS", 10);

        let trial_days: i64 = get_env_default("TRIAL_DAYS", 14);
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 60);
        let pending_sweep_interval_secs: u64 =
            get_env_default("PENDING_SWEEP_INTERVAL_SECS", 300);
        let pending_sweep_threshold_mins: i64 =
            get_env_default("PENDING_SWEEP_THRESHOLD_MINS", 60);

        Self {
            bind_addr,
            database_url,
            redis_url,
            cors_origin,
            jwt_secret,
            session_ttl: Duration::seconds(session_ttl_secs),
            gateway_base_url,
            gateway_access_token,
            webhook_secret,
            gateway_timeout_secs,
            trial_days,
            rate_limit_window_secs,
            rate_limit_per_ip,
            pending_sweep_interval_secs,
            pending_sweep_threshold_mins,
        }
    }
}
