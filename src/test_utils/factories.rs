//! Test data factories. Each creates a complete, valid object with sensible
//! defaults; use the closure parameter to override fields.

use chrono::{Duration, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    external_reference::ExternalReference,
    signup_intent::{SignupIntent, SignupIntentStatus},
    subscription_plan::Plan,
    tenant_billing::{SubscriptionStatus, TenantBillingState},
};

pub fn test_datetime() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Create a test plan with sensible defaults.
pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        id: Uuid::new_v4(),
        key: "basic".to_string(),
        external_plan_id: "plan_ext_test".to_string(),
        name: "Basic Plan".to_string(),
        price_cents: 9_990,
        currency: "ARS".to_string(),
        is_active: true,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut plan);
    plan
}

/// Create a tenant billing row with sensible defaults (fresh trial).
pub fn create_test_billing_state(
    tenant_id: i64,
    overrides: impl FnOnce(&mut TenantBillingState),
) -> TenantBillingState {
    let mut state = TenantBillingState {
        tenant_id,
        subscription_status: SubscriptionStatus::Trial,
        subscription_plan_id: None,
        external_subscription_id: None,
        trial_ends_at: Some(test_datetime() + Duration::days(14)),
        current_period_end: None,
        subscription_started_at: None,
        last_event_at: Some(test_datetime()),
    };
    overrides(&mut state);
    state
}

/// Create a signup intent with sensible defaults.
pub fn create_test_signup_intent(overrides: impl FnOnce(&mut SignupIntent)) -> SignupIntent {
    let id = Uuid::new_v4();
    let mut intent = SignupIntent {
        id,
        email: "new@example.com".to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$AAAAAAAAAAA".to_string(),
        plan_id: Uuid::new_v4(),
        status: SignupIntentStatus::Created,
        external_subscription_id: None,
        external_reference: ExternalReference::for_signup(id),
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut intent);
    intent
}
