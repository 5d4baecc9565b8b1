use axum::Router;

use crate::adapters::http::app_state::AppState;

pub mod billing;
pub mod billing_webhooks;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing::router())
        .nest("/public", billing::public_router())
        .nest("/session", session::router())
        .nest("/webhooks", billing_webhooks::router())
}
