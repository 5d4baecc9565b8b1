use dotenvy::dotenv;
use tracing::info;

use std::net::SocketAddr;
use taller_api::infra::{
    app::create_app, pending_sweep::run_pending_reconciliation_loop, setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;

    let app = create_app(app_state.clone());

    // Spawn the pending reconciliation sweep (after tracing is initialized)
    let webhook_use_cases = app_state.webhook_use_cases.clone();
    let sweep_interval = app_state.config.pending_sweep_interval_secs;
    let sweep_threshold = app_state.config.pending_sweep_threshold_mins;
    tokio::spawn(async move {
        run_pending_reconciliation_loop(webhook_use_cases, sweep_interval, sweep_threshold).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
