use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::PaymentGatewayPort,
    application::use_cases::billing::{
        BillingStateUpdate, PlanRepo, SignupIntentRepo, TenantBillingRepo,
    },
    application::webhook_ingress::WebhookNotification,
    domain::entities::{
        external_reference::ExternalReference, processed_event::ProcessedEvent,
        tenant_billing::SubscriptionStatus,
    },
};

/// Topics that refer to a preapproval resource. Everything else is recorded
/// for audit and otherwise ignored.
const SUBSCRIPTION_TOPICS: &[&str] = &["preapproval", "subscription_preapproval"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Tenant billing state overwritten with the authoritative snapshot.
    Applied,
    /// Signup intent approved.
    SignupApproved,
    /// Recorded but deliberately not acted on (foreign topic, or a signup
    /// notification that is not yet active).
    Ignored,
    /// Terminal: the notification references nothing this system initiated.
    Unresolvable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Already in the ledger; zero writes performed.
    Duplicate,
    Processed(ReconcileOutcome),
}

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait ProcessedEventRepo: Send + Sync {
    /// Atomic conditional insert keyed by `event_id` — the sole concurrency
    /// primitive that makes at-least-once delivery safe. Returns whether
    /// this delivery is the first sight of the event.
    async fn record_if_new(
        &self,
        event_id: &str,
        topic: &str,
        resource_id: &str,
        raw_payload: &serde_json::Value,
    ) -> AppResult<bool>;

    /// Stamp `processed_at` outside of a tenant/intent transaction (skipped
    /// or unresolvable events, and signup events that carry no state
    /// change).
    async fn mark_processed(
        &self,
        event_id: &str,
        tenant_id: Option<i64>,
        intent_id: Option<Uuid>,
        applied: bool,
    ) -> AppResult<()>;

    async fn get(&self, event_id: &str) -> AppResult<Option<ProcessedEvent>>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct WebhookUseCases {
    event_repo: Arc<dyn ProcessedEventRepo>,
    tenant_billing_repo: Arc<dyn TenantBillingRepo>,
    plan_repo: Arc<dyn PlanRepo>,
    intent_repo: Arc<dyn SignupIntentRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
}

impl WebhookUseCases {
    pub fn new(
        event_repo: Arc<dyn ProcessedEventRepo>,
        tenant_billing_repo: Arc<dyn TenantBillingRepo>,
        plan_repo: Arc<dyn PlanRepo>,
        intent_repo: Arc<dyn SignupIntentRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
    ) -> Self {
        Self {
            event_repo,
            tenant_billing_repo,
            plan_repo,
            intent_repo,
            gateway,
        }
    }

    /// Ledger-gated entry point: record the event, and reconcile only on
    /// first sight. A `Duplicate` performs zero writes. A redelivery of an
    /// event whose reconciliation never finished (`processed_at` still null
    /// after a transient failure) runs reconciliation again — that retry is
    /// what makes the ledger-write/state-write pair eventually consistent.
    pub async fn process(
        &self,
        notification: &WebhookNotification,
        event_id: &str,
        raw_payload: &serde_json::Value,
    ) -> AppResult<WebhookOutcome> {
        let is_new = self
            .event_repo
            .record_if_new(
                event_id,
                &notification.topic,
                &notification.resource_id,
                raw_payload,
            )
            .await?;
        if !is_new {
            let unfinished = self
                .event_repo
                .get(event_id)
                .await?
                .map(|e| e.processed_at.is_none())
                .unwrap_or(false);
            if !unfinished {
                tracing::debug!(event_id, "Duplicate webhook delivery, skipping");
                return Ok(WebhookOutcome::Duplicate);
            }
            tracing::info!(event_id, "Redelivery of an unfinished event, retrying");
        }

        let outcome = self.reconcile(notification, event_id).await?;
        Ok(WebhookOutcome::Processed(outcome))
    }

    /// Reconcile one novel event against the gateway's source of truth.
    ///
    /// The webhook payload is a notification, not a fact: the current
    /// resource is always re-fetched, so reapplying the same (or an older)
    /// event converges on whatever the gateway currently reports.
    pub async fn reconcile(
        &self,
        notification: &WebhookNotification,
        event_id: &str,
    ) -> AppResult<ReconcileOutcome> {
        if !SUBSCRIPTION_TOPICS.contains(&notification.topic.as_str()) {
            tracing::debug!(
                event_id,
                topic = %notification.topic,
                "Non-subscription topic, recorded for audit only"
            );
            self.event_repo
                .mark_processed(event_id, None, None, false)
                .await?;
            return Ok(ReconcileOutcome::Ignored);
        }

        let preapproval = match self.gateway.get_preapproval(&notification.resource_id).await {
            Ok(p) => p,
            Err(AppError::NotFound) => {
                // The gateway no longer knows the resource; retrying cannot
                // help. The ledger row stays for manual audit.
                tracing::warn!(
                    event_id,
                    resource_id = %notification.resource_id,
                    "Preapproval not found at gateway, marking unresolvable"
                );
                self.event_repo
                    .mark_processed(event_id, None, None, false)
                    .await?;
                return Ok(ReconcileOutcome::Unresolvable);
            }
            // Transient failures propagate; the ledger row keeps
            // processed_at null and the redelivery retries the whole step.
            Err(e) => return Err(e),
        };

        let status = SubscriptionStatus::from_gateway(&preapproval.status);

        match ExternalReference::parse(preapproval.external_reference.as_deref()) {
            ExternalReference::Tenant {
                tenant_id,
                plan_key,
            } => {
                let plan = self.plan_repo.get_by_key(&plan_key).await?;
                if plan.is_none() {
                    tracing::warn!(
                        event_id,
                        tenant_id,
                        plan_key = %plan_key,
                        "Plan key from external reference not found, keeping stored plan"
                    );
                }
                let update = BillingStateUpdate {
                    status,
                    plan_id: plan.map(|p| p.id),
                    external_subscription_id: Some(preapproval.id.clone()),
                    current_period_end: preapproval.next_payment_date.map(|d| d.naive_utc()),
                };
                match self
                    .tenant_billing_repo
                    .apply_reconciliation(event_id, tenant_id, &update)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(
                            event_id,
                            tenant_id,
                            status = status.as_str(),
                            "Applied authoritative subscription state"
                        );
                        Ok(ReconcileOutcome::Applied)
                    }
                    Err(AppError::NotFound) => {
                        tracing::warn!(
                            event_id,
                            tenant_id,
                            "Referenced tenant has no billing state, marking unresolvable"
                        );
                        self.event_repo
                            .mark_processed(event_id, None, None, false)
                            .await?;
                        Ok(ReconcileOutcome::Unresolvable)
                    }
                    Err(e) => Err(e),
                }
            }
            ExternalReference::Signup { intent_id } => {
                let Ok(intent_id) = Uuid::parse_str(&intent_id) else {
                    self.event_repo
                        .mark_processed(event_id, None, None, false)
                        .await?;
                    return Ok(ReconcileOutcome::Unresolvable);
                };
                if status == SubscriptionStatus::Active {
                    match self
                        .intent_repo
                        .apply_approval(event_id, intent_id, &preapproval.id)
                        .await
                    {
                        Ok(()) => {
                            tracing::info!(event_id, intent_id = %intent_id, "Signup intent approved");
                            Ok(ReconcileOutcome::SignupApproved)
                        }
                        Err(AppError::NotFound) => {
                            self.event_repo
                                .mark_processed(event_id, None, None, false)
                                .await?;
                            Ok(ReconcileOutcome::Unresolvable)
                        }
                        Err(e) => Err(e),
                    }
                } else {
                    self.event_repo
                        .mark_processed(event_id, None, Some(intent_id), false)
                        .await?;
                    Ok(ReconcileOutcome::Ignored)
                }
            }
            ExternalReference::Unknown => {
                tracing::warn!(
                    event_id,
                    resource_id = %notification.resource_id,
                    "Notification for a resource this system never initiated"
                );
                self.event_repo
                    .mark_processed(event_id, None, None, false)
                    .await?;
                Ok(ReconcileOutcome::Unresolvable)
            }
        }
    }

    /// Recovery path for permanently lost webhooks: re-fetch gateway state
    /// for tenants stuck in `pending` longer than the threshold and write it
    /// through the same mapper. Individual failures are logged and skipped
    /// so one bad row cannot stall the sweep.
    pub async fn sweep_stale_pending(&self, older_than_mins: i64) -> AppResult<usize> {
        let cutoff = Utc::now().naive_utc() - Duration::minutes(older_than_mins);
        let stale = self.tenant_billing_repo.list_stale_pending(cutoff).await?;

        let mut updated = 0;
        for state in stale {
            let Some(external_id) = state.external_subscription_id.clone() else {
                continue;
            };
            match self.gateway.get_preapproval(&external_id).await {
                Ok(preapproval) => {
                    let update = BillingStateUpdate {
                        status: SubscriptionStatus::from_gateway(&preapproval.status),
                        plan_id: None,
                        external_subscription_id: Some(preapproval.id.clone()),
                        current_period_end: preapproval.next_payment_date.map(|d| d.naive_utc()),
                    };
                    match self
                        .tenant_billing_repo
                        .apply_update(state.tenant_id, &update)
                        .await
                    {
                        Ok(_) => updated += 1,
                        Err(e) => {
                            tracing::warn!(
                                tenant_id = state.tenant_id,
                                error = %e,
                                "Pending sweep write failed"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        tenant_id = state.tenant_id,
                        external_subscription_id = %external_id,
                        error = %e,
                        "Pending sweep could not fetch gateway state"
                    );
                }
            }
        }
        Ok(updated)
    }
}
