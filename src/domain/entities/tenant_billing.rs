use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Trial,
    Pending,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Map a gateway preapproval status onto the local vocabulary.
    ///
    /// Total over every input; the gateway's vocabulary is not contractually
    /// stable, so unrecognized states fall back to `Pending` rather than ever
    /// granting access.
    pub fn from_gateway(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "authorized" | "active" => SubscriptionStatus::Active,
            "pending" => SubscriptionStatus::Pending,
            "paused" => SubscriptionStatus::PastDue,
            "cancelled" | "canceled" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Pending,
        }
    }
}

/// Per-tenant billing state. Mutated only by the reconciliation engine and
/// the subscription lifecycle operations; the access gate reads it.
#[derive(Debug, Clone, Serialize)]
pub struct TenantBillingState {
    pub tenant_id: i64,
    pub subscription_status: SubscriptionStatus,
    pub subscription_plan_id: Option<Uuid>,
    pub external_subscription_id: Option<String>,
    pub trial_ends_at: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub subscription_started_at: Option<NaiveDateTime>,
    pub last_event_at: Option<NaiveDateTime>,
}

impl TenantBillingState {
    /// Access decision: an active subscription, or a trial that has not run
    /// out. A trial row without a deadline is treated as expired.
    pub fn has_access(&self, now: NaiveDateTime) -> bool {
        match self.subscription_status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => self.trial_ends_at.map(|t| t > now).unwrap_or(false),
            _ => false,
        }
    }
}
