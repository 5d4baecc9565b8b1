//! Session surface kept outside the access gate: a locked-out tenant must
//! still be able to see who they are (and their billing status) and end
//! their session. Token issuance lives with the auth module, not here.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::{
    adapters::http::{app_state::AppState, middleware::authenticate},
    app_error::{AppError, AppResult},
    domain::entities::tenant_billing::SubscriptionStatus,
};

#[derive(Serialize)]
struct WhoamiResponse {
    tenant_id: i64,
    subscription_status: SubscriptionStatus,
    trial_ends_at: Option<chrono::NaiveDateTime>,
}

/// GET /api/session/me
async fn whoami(
    State(app_state): State<AppState>,
    cookies: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let tenant_id = authenticate(&app_state, &cookies, &headers)?;
    let status = app_state.billing_use_cases.billing_status(tenant_id).await?;
    Ok(Json(WhoamiResponse {
        tenant_id,
        subscription_status: status.state.subscription_status,
        trial_ends_at: status.state.trial_ends_at,
    }))
}

/// POST /api/session/logout
async fn logout() -> AppResult<impl IntoResponse> {
    let cookie = Cookie::build(("session_token", ""))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build();

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|_| AppError::Internal("Failed to build cookie header".into()))?;
    headers.append("set-cookie", value);

    Ok((StatusCode::NO_CONTENT, headers))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(whoami))
        .route("/logout", post(logout))
}
