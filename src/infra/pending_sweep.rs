use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::application::use_cases::webhook_processing::WebhookUseCases;

/// Recovery loop for permanently lost webhooks: tenants stuck in `pending`
/// with an external subscription longer than the threshold are re-fetched
/// from the gateway and written through the normal reconciliation mapper.
pub async fn run_pending_reconciliation_loop(
    webhook_use_cases: Arc<WebhookUseCases>,
    interval_secs: u64,
    threshold_mins: i64,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));

    info!(
        "Pending reconciliation sweep started (every {}s, threshold {}min)",
        interval_secs, threshold_mins
    );

    loop {
        ticker.tick().await;

        match webhook_use_cases.sweep_stale_pending(threshold_mins).await {
            Ok(0) => {}
            Ok(updated) => {
                info!(updated, "Pending sweep reconciled stale subscriptions");
            }
            Err(e) => {
                error!(error = %e, "Pending sweep failed");
            }
        }
    }
}
