use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

/// Routes that must stay reachable for a locked-out tenant: billing
/// management, session inspection/teardown, and the public surfaces the
/// gateway or a not-yet-tenant hits.
const GATE_EXEMPT_PREFIXES: &[&str] = &[
    "/api/billing",
    "/api/session",
    "/api/public",
    "/api/webhooks",
];

pub fn is_gate_exempt(path: &str) -> bool {
    GATE_EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Resolve the tenant id from the session cookie or a bearer token.
pub fn authenticate(
    app_state: &AppState,
    cookies: &CookieJar,
    headers: &HeaderMap,
) -> AppResult<i64> {
    let token = cookies
        .get("session_token")
        .map(|c| c.value().to_owned())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_owned)
        })
        .ok_or(AppError::Unauthorized)?;

    let claims = jwt::verify(&token, &app_state.config.jwt_secret)?;
    claims.sub.parse::<i64>().map_err(|_| AppError::Unauthorized)
}

/// Subscription access gate. A single local read of already-reconciled
/// billing state per request; never calls the gateway.
pub async fn subscription_gate(
    State(app_state): State<AppState>,
    cookies: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_gate_exempt(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let tenant_id = authenticate(&app_state, &cookies, request.headers())?;
    app_state.billing_use_cases.check_access(tenant_id).await?;

    Ok(next.run(request).await)
}

/// Per-IP rate limiting on tenant-facing routes. The webhook path is
/// excluded: the processor's retry storms must never be throttled into
/// losing deliveries.
pub async fn rate_limit_middleware(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !request.uri().path().starts_with("/api/webhooks") {
        app_state.rate_limiter.check(&addr.ip().to_string()).await?;
    }
    Ok(next.run(request).await)
}
