use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{CreatePreapproval, PaymentGatewayPort},
    domain::entities::{
        external_reference::ExternalReference,
        signup_intent::{SignupIntent, SignupIntentStatus},
        subscription_plan::Plan,
        tenant_billing::{SubscriptionStatus, TenantBillingState},
    },
};

// ============================================================================
// Input / Output Types
// ============================================================================

/// Overwrite-style write applied to a tenant's billing state. `plan_id` and
/// `external_subscription_id` keep their stored value when `None`;
/// `current_period_end` is always overwritten with the authoritative value.
#[derive(Debug, Clone)]
pub struct BillingStateUpdate {
    pub status: SubscriptionStatus,
    pub plan_id: Option<Uuid>,
    pub external_subscription_id: Option<String>,
    pub current_period_end: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionInput {
    pub plan_key: String,
    pub payer_email: String,
    pub return_url: String,
    pub card_token_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    pub status: SubscriptionStatus,
    pub external_subscription_id: String,
    /// Hosted checkout URL when the gateway wants the payer redirected.
    pub init_point: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupCheckoutInput {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub plan_key: String,
    pub return_url: String,
    pub card_token_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupCheckoutResponse {
    pub intent_id: Uuid,
    pub status: SignupIntentStatus,
    pub init_point: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSignupIntentInput {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub plan_id: Uuid,
    pub external_reference: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingStatusResponse {
    pub state: TenantBillingState,
    pub plans: Vec<Plan>,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait TenantBillingRepo: Send + Sync {
    async fn get(&self, tenant_id: i64) -> AppResult<Option<TenantBillingState>>;

    /// Overwrite billing state outside of webhook processing (lifecycle
    /// operations and the pending sweep). `NotFound` when the tenant row
    /// does not exist.
    async fn apply_update(
        &self,
        tenant_id: i64,
        update: &BillingStateUpdate,
    ) -> AppResult<TenantBillingState>;

    /// Reconciliation write: billing state and the ledger row's
    /// `tenant_id`/`processed_at` are committed in one transaction so a
    /// partial failure leaves the event unprocessed and retryable.
    async fn apply_reconciliation(
        &self,
        event_id: &str,
        tenant_id: i64,
        update: &BillingStateUpdate,
    ) -> AppResult<()>;

    /// Tenants stuck in `pending` with an external subscription since before
    /// the cutoff; input to the pending sweep.
    async fn list_stale_pending(&self, cutoff: NaiveDateTime)
    -> AppResult<Vec<TenantBillingState>>;
}

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_key(&self, key: &str) -> AppResult<Option<Plan>>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;
    async fn list_active(&self) -> AppResult<Vec<Plan>>;
}

#[async_trait]
pub trait SignupIntentRepo: Send + Sync {
    async fn create(&self, input: &CreateSignupIntentInput) -> AppResult<SignupIntent>;
    async fn get(&self, id: Uuid) -> AppResult<Option<SignupIntent>>;
    async fn set_pending(&self, id: Uuid, external_subscription_id: &str) -> AppResult<()>;
    async fn set_failed(&self, id: Uuid) -> AppResult<()>;

    /// Approval write, transactional with the ledger row (mirrors
    /// `TenantBillingRepo::apply_reconciliation`).
    async fn apply_approval(
        &self,
        event_id: &str,
        id: Uuid,
        external_subscription_id: &str,
    ) -> AppResult<()>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    tenant_billing_repo: Arc<dyn TenantBillingRepo>,
    plan_repo: Arc<dyn PlanRepo>,
    intent_repo: Arc<dyn SignupIntentRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
}

impl BillingUseCases {
    pub fn new(
        tenant_billing_repo: Arc<dyn TenantBillingRepo>,
        plan_repo: Arc<dyn PlanRepo>,
        intent_repo: Arc<dyn SignupIntentRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
    ) -> Self {
        Self {
            tenant_billing_repo,
            plan_repo,
            intent_repo,
            gateway,
        }
    }

    /// Tenant-facing projection: current billing state plus the active plans.
    pub async fn billing_status(&self, tenant_id: i64) -> AppResult<BillingStatusResponse> {
        let state = self
            .tenant_billing_repo
            .get(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let plans = self.plan_repo.list_active().await?;
        Ok(BillingStatusResponse { state, plans })
    }

    pub async fn list_active_plans(&self) -> AppResult<Vec<Plan>> {
        self.plan_repo.list_active().await
    }

    /// Access-gate read path: a single local read, no gateway calls.
    pub async fn check_access(&self, tenant_id: i64) -> AppResult<()> {
        let now = chrono::Utc::now().naive_utc();
        let state = self.tenant_billing_repo.get(tenant_id).await?;
        let (status, trial_ends_at) = match &state {
            Some(s) if s.has_access(now) => return Ok(()),
            Some(s) => (s.subscription_status, s.trial_ends_at),
            None => (SubscriptionStatus::None, None),
        };
        Err(AppError::SubscriptionRequired {
            status,
            trial_ends_at,
        })
    }

    /// Start a subscription for an existing tenant. Local state moves to
    /// `pending` optimistically; the webhook confirms `active` later. A
    /// gateway failure leaves local state untouched.
    pub async fn create_subscription(
        &self,
        tenant_id: i64,
        input: &CreateSubscriptionInput,
    ) -> AppResult<SubscribeResponse> {
        validate_return_url(&input.return_url)?;

        let state = self
            .tenant_billing_repo
            .get(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;

        // Best-effort double-click guard, not a distributed lock.
        match state.subscription_status {
            SubscriptionStatus::Active => {
                return Err(AppError::Conflict("subscription is already active".into()));
            }
            SubscriptionStatus::Pending if state.external_subscription_id.is_some() => {
                return Err(AppError::Conflict(
                    "a subscription is already awaiting confirmation".into(),
                ));
            }
            _ => {}
        }

        let plan = self
            .plan_repo
            .get_by_key(&input.plan_key)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::NotFound)?;

        let preapproval = self
            .gateway
            .create_preapproval(&CreatePreapproval {
                preapproval_plan_id: plan.external_plan_id.clone(),
                payer_email: input.payer_email.clone(),
                back_url: input.return_url.clone(),
                card_token_id: input.card_token_id.clone(),
                external_reference: ExternalReference::for_tenant(tenant_id, &plan.key),
            })
            .await?;

        self.tenant_billing_repo
            .apply_update(
                tenant_id,
                &BillingStateUpdate {
                    status: SubscriptionStatus::Pending,
                    plan_id: Some(plan.id),
                    external_subscription_id: Some(preapproval.id.clone()),
                    current_period_end: None,
                },
            )
            .await?;

        tracing::info!(
            tenant_id,
            plan_key = %plan.key,
            external_subscription_id = %preapproval.id,
            "Subscription created, awaiting gateway confirmation"
        );

        Ok(SubscribeResponse {
            status: SubscriptionStatus::Pending,
            external_subscription_id: preapproval.id,
            init_point: preapproval.init_point,
        })
    }

    /// Cancel at the gateway, then re-fetch the authoritative resource and
    /// write its mapped status (the mutation response is not trusted). The
    /// follow-up webhook for the same cancellation deduplicates via the
    /// ledger.
    pub async fn cancel_subscription(&self, tenant_id: i64) -> AppResult<TenantBillingState> {
        let state = self
            .tenant_billing_repo
            .get(tenant_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let external_id = state
            .external_subscription_id
            .ok_or_else(|| AppError::Conflict("no subscription to cancel".into()))?;

        self.gateway.cancel_preapproval(&external_id).await?;
        let current = self.gateway.get_preapproval(&external_id).await?;

        let updated = self
            .tenant_billing_repo
            .apply_update(
                tenant_id,
                &BillingStateUpdate {
                    status: SubscriptionStatus::from_gateway(&current.status),
                    plan_id: None,
                    external_subscription_id: Some(external_id),
                    current_period_end: current.next_payment_date.map(|d| d.naive_utc()),
                },
            )
            .await?;

        tracing::info!(tenant_id, "Subscription canceled");
        Ok(updated)
    }

    /// Pre-tenant checkout: persist a signup intent, then create the gateway
    /// subscription bound to it. The reconciliation engine approves the
    /// intent once the gateway reports the subscription active.
    pub async fn start_signup_checkout(
        &self,
        input: &SignupCheckoutInput,
    ) -> AppResult<SignupCheckoutResponse> {
        input
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        validate_return_url(&input.return_url)?;

        let plan = self
            .plan_repo
            .get_by_key(&input.plan_key)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::NotFound)?;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
            .to_string();

        let intent_id = Uuid::new_v4();
        let intent = self
            .intent_repo
            .create(&CreateSignupIntentInput {
                id: intent_id,
                email: input.email.clone(),
                password_hash,
                plan_id: plan.id,
                external_reference: ExternalReference::for_signup(intent_id),
            })
            .await?;

        let preapproval = match self
            .gateway
            .create_preapproval(&CreatePreapproval {
                preapproval_plan_id: plan.external_plan_id.clone(),
                payer_email: input.email.clone(),
                back_url: input.return_url.clone(),
                card_token_id: input.card_token_id.clone(),
                external_reference: intent.external_reference.clone(),
            })
            .await
        {
            Ok(p) => p,
            Err(e) => {
                if let Err(mark_err) = self.intent_repo.set_failed(intent_id).await {
                    tracing::warn!(
                        intent_id = %intent_id,
                        error = %mark_err,
                        "Failed to mark signup intent as failed"
                    );
                }
                return Err(e);
            }
        };

        self.intent_repo
            .set_pending(intent_id, &preapproval.id)
            .await?;

        Ok(SignupCheckoutResponse {
            intent_id,
            status: SignupIntentStatus::Pending,
            init_point: preapproval.init_point,
        })
    }
}

fn validate_return_url(raw: &str) -> AppResult<()> {
    let url = Url::parse(raw)
        .map_err(|_| AppError::InvalidInput("return_url must be a valid URL".into()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::InvalidInput(
            "return_url must use http or https".into(),
        ));
    }
    Ok(())
}
