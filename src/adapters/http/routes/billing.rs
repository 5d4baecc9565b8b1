//! Tenant-facing billing endpoints, plus the public pre-tenant signup
//! checkout. All of these stay reachable while the access gate denies the
//! rest of the API.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;

use crate::{
    adapters::http::{app_state::AppState, middleware::authenticate},
    app_error::AppResult,
    application::use_cases::billing::{CreateSubscriptionInput, SignupCheckoutInput},
};

/// GET /api/billing/status
/// Current billing state plus the active plans, for client display.
async fn get_status(
    State(app_state): State<AppState>,
    cookies: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let tenant_id = authenticate(&app_state, &cookies, &headers)?;
    let status = app_state.billing_use_cases.billing_status(tenant_id).await?;
    Ok(Json(status))
}

/// GET /api/billing/plans
async fn get_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let plans = app_state.billing_use_cases.list_active_plans().await?;
    Ok(Json(plans))
}

/// POST /api/billing/subscribe
async fn subscribe(
    State(app_state): State<AppState>,
    cookies: CookieJar,
    headers: HeaderMap,
    Json(input): Json<CreateSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = authenticate(&app_state, &cookies, &headers)?;
    let result = app_state
        .billing_use_cases
        .create_subscription(tenant_id, &input)
        .await?;
    Ok(Json(result))
}

/// POST /api/billing/cancel
async fn cancel(
    State(app_state): State<AppState>,
    cookies: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let tenant_id = authenticate(&app_state, &cookies, &headers)?;
    let state = app_state
        .billing_use_cases
        .cancel_subscription(tenant_id)
        .await?;
    Ok(Json(state))
}

/// POST /api/public/signup/checkout
/// Starts a subscription before any tenant account exists.
async fn signup_checkout(
    State(app_state): State<AppState>,
    Json(input): Json<SignupCheckoutInput>,
) -> AppResult<impl IntoResponse> {
    let result = app_state
        .billing_use_cases
        .start_signup_checkout(&input)
        .await?;
    Ok(Json(result))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/plans", get(get_plans))
        .route("/subscribe", post(subscribe))
        .route("/cancel", post(cancel))
}

pub(crate) fn public_router() -> Router<AppState> {
    Router::new().route("/signup/checkout", post(signup_checkout))
}
