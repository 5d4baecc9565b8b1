use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

/// Immutable reference data: one row per sellable plan. `key` is the stable
/// business identifier embedded in external references; `external_plan_id`
/// is the gateway-side preapproval-plan id.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub key: String,
    pub external_plan_id: String,
    pub name: String,
    pub price_cents: i32,
    pub currency: String,
    pub is_active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}
