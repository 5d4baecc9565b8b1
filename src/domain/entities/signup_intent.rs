use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "signup_intent_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SignupIntentStatus {
    Created,
    Pending,
    Approved,
    Failed,
}

/// A subscription started before any tenant account exists. The checkout
/// operation creates it; only the reconciliation engine moves it to
/// `approved`/`failed`. Turning an approved intent into a real tenant
/// happens out of band.
#[derive(Debug, Clone, Serialize)]
pub struct SignupIntent {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub plan_id: Uuid,
    pub status: SignupIntentStatus,
    pub external_subscription_id: Option<String>,
    pub external_reference: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}
