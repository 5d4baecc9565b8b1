//! In-memory mock implementations for the billing repository traits.
//!
//! `apply_reconciliation`/`apply_approval` mirror the production SQL
//! transactions: when linked to an event store they update the ledger row in
//! the same logical step as the state write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::billing::{
        BillingStateUpdate, CreateSignupIntentInput, PlanRepo, SignupIntentRepo, TenantBillingRepo,
    },
    application::use_cases::webhook_processing::ProcessedEventRepo,
    domain::entities::{
        processed_event::ProcessedEvent,
        signup_intent::{SignupIntent, SignupIntentStatus},
        subscription_plan::Plan,
        tenant_billing::{SubscriptionStatus, TenantBillingState},
    },
    infra::rate_limit::RateLimiterTrait,
};

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

// ============================================================================
// InMemoryProcessedEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryProcessedEventRepo {
    pub events: Mutex<HashMap<String, ProcessedEvent>>,
}

impl InMemoryProcessedEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    fn set_processed_sync(
        &self,
        event_id: &str,
        tenant_id: Option<i64>,
        intent_id: Option<Uuid>,
        applied: bool,
    ) {
        if let Some(event) = self.events.lock().unwrap().get_mut(event_id) {
            event.processed_at = Some(now());
            event.applied = applied;
            event.tenant_id = tenant_id;
            event.intent_id = intent_id;
        }
    }
}

#[async_trait]
impl ProcessedEventRepo for InMemoryProcessedEventRepo {
    async fn record_if_new(
        &self,
        event_id: &str,
        topic: &str,
        resource_id: &str,
        raw_payload: &serde_json::Value,
    ) -> AppResult<bool> {
        let mut events = self.events.lock().unwrap();
        if events.contains_key(event_id) {
            return Ok(false);
        }
        events.insert(
            event_id.to_string(),
            ProcessedEvent {
                event_id: event_id.to_string(),
                topic: topic.to_string(),
                resource_id: resource_id.to_string(),
                raw_payload: raw_payload.clone(),
                received_at: Some(now()),
                processed_at: None,
                applied: false,
                tenant_id: None,
                intent_id: None,
            },
        );
        Ok(true)
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        tenant_id: Option<i64>,
        intent_id: Option<Uuid>,
        applied: bool,
    ) -> AppResult<()> {
        self.set_processed_sync(event_id, tenant_id, intent_id, applied);
        Ok(())
    }

    async fn get(&self, event_id: &str) -> AppResult<Option<ProcessedEvent>> {
        Ok(self.events.lock().unwrap().get(event_id).cloned())
    }
}

// ============================================================================
// InMemoryTenantBillingRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryTenantBillingRepo {
    pub states: Mutex<HashMap<i64, TenantBillingState>>,
    events: Mutex<Option<Arc<InMemoryProcessedEventRepo>>>,
}

impl InMemoryTenantBillingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(states: Vec<TenantBillingState>) -> Self {
        let map: HashMap<i64, TenantBillingState> =
            states.into_iter().map(|s| (s.tenant_id, s)).collect();
        Self {
            states: Mutex::new(map),
            events: Mutex::new(None),
        }
    }

    pub fn insert(&self, state: TenantBillingState) {
        self.states.lock().unwrap().insert(state.tenant_id, state);
    }

    pub fn get_sync(&self, tenant_id: i64) -> Option<TenantBillingState> {
        self.states.lock().unwrap().get(&tenant_id).cloned()
    }

    /// Couple reconciliation writes to a ledger, as the SQL transaction does.
    pub fn link_events(&self, events: Arc<InMemoryProcessedEventRepo>) {
        *self.events.lock().unwrap() = Some(events);
    }

    fn apply(state: &mut TenantBillingState, update: &BillingStateUpdate) {
        state.subscription_status = update.status;
        if update.plan_id.is_some() {
            state.subscription_plan_id = update.plan_id;
        }
        if update.external_subscription_id.is_some() {
            state.external_subscription_id = update.external_subscription_id.clone();
        }
        state.current_period_end = update.current_period_end;
        if update.status == SubscriptionStatus::Active && state.subscription_started_at.is_none() {
            state.subscription_started_at = Some(now());
        }
        state.last_event_at = Some(now());
    }
}

#[async_trait]
impl TenantBillingRepo for InMemoryTenantBillingRepo {
    async fn get(&self, tenant_id: i64) -> AppResult<Option<TenantBillingState>> {
        Ok(self.states.lock().unwrap().get(&tenant_id).cloned())
    }

    async fn apply_update(
        &self,
        tenant_id: i64,
        update: &BillingStateUpdate,
    ) -> AppResult<TenantBillingState> {
        let mut states = self.states.lock().unwrap();
        let state = states.get_mut(&tenant_id).ok_or(AppError::NotFound)?;
        Self::apply(state, update);
        Ok(state.clone())
    }

    async fn apply_reconciliation(
        &self,
        event_id: &str,
        tenant_id: i64,
        update: &BillingStateUpdate,
    ) -> AppResult<()> {
        {
            let mut states = self.states.lock().unwrap();
            let state = states.get_mut(&tenant_id).ok_or(AppError::NotFound)?;
            Self::apply(state, update);
        }
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.set_processed_sync(event_id, Some(tenant_id), None, true);
        }
        Ok(())
    }

    async fn list_stale_pending(
        &self,
        cutoff: NaiveDateTime,
    ) -> AppResult<Vec<TenantBillingState>> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                s.subscription_status == SubscriptionStatus::Pending
                    && s.external_subscription_id.is_some()
                    && s.last_event_at.map(|t| t < cutoff).unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, Plan>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<Plan>) -> Self {
        let map: HashMap<Uuid, Plan> = plans.into_iter().map(|p| (p.id, p)).collect();
        Self {
            plans: Mutex::new(map),
        }
    }

    pub fn insert(&self, plan: Plan) {
        self.plans.lock().unwrap().insert(plan.id, plan);
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_key(&self, key: &str) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.key == key)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.price_cents);
        Ok(plans)
    }
}

// ============================================================================
// InMemorySignupIntentRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySignupIntentRepo {
    pub intents: Mutex<HashMap<Uuid, SignupIntent>>,
    events: Mutex<Option<Arc<InMemoryProcessedEventRepo>>>,
}

impl InMemorySignupIntentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, intent: SignupIntent) {
        self.intents.lock().unwrap().insert(intent.id, intent);
    }

    pub fn all(&self) -> Vec<SignupIntent> {
        self.intents.lock().unwrap().values().cloned().collect()
    }

    pub fn link_events(&self, events: Arc<InMemoryProcessedEventRepo>) {
        *self.events.lock().unwrap() = Some(events);
    }
}

#[async_trait]
impl SignupIntentRepo for InMemorySignupIntentRepo {
    async fn create(&self, input: &CreateSignupIntentInput) -> AppResult<SignupIntent> {
        let intent = SignupIntent {
            id: input.id,
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            plan_id: input.plan_id,
            status: SignupIntentStatus::Created,
            external_subscription_id: None,
            external_reference: input.external_reference.clone(),
            created_at: Some(now()),
            updated_at: Some(now()),
        };
        self.intents
            .lock()
            .unwrap()
            .insert(intent.id, intent.clone());
        Ok(intent)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<SignupIntent>> {
        Ok(self.intents.lock().unwrap().get(&id).cloned())
    }

    async fn set_pending(&self, id: Uuid, external_subscription_id: &str) -> AppResult<()> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(&id).ok_or(AppError::NotFound)?;
        intent.status = SignupIntentStatus::Pending;
        intent.external_subscription_id = Some(external_subscription_id.to_string());
        intent.updated_at = Some(now());
        Ok(())
    }

    async fn set_failed(&self, id: Uuid) -> AppResult<()> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(&id).ok_or(AppError::NotFound)?;
        intent.status = SignupIntentStatus::Failed;
        intent.updated_at = Some(now());
        Ok(())
    }

    async fn apply_approval(
        &self,
        event_id: &str,
        id: Uuid,
        external_subscription_id: &str,
    ) -> AppResult<()> {
        {
            let mut intents = self.intents.lock().unwrap();
            let intent = intents.get_mut(&id).ok_or(AppError::NotFound)?;
            intent.status = SignupIntentStatus::Approved;
            intent.external_subscription_id = Some(external_subscription_id.to_string());
            intent.updated_at = Some(now());
        }
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.set_processed_sync(event_id, None, Some(id), true);
        }
        Ok(())
    }
}

// ============================================================================
// NoopRateLimiter
// ============================================================================

#[derive(Default)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiterTrait for NoopRateLimiter {
    async fn check(&self, _ip: &str) -> AppResult<()> {
        Ok(())
    }
}
