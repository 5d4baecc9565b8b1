use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

/// Idempotency ledger row. `event_id` is a deterministic hash of the
/// delivery metadata, so re-deliveries of the same logical event collide by
/// construction. `processed_at` stays null until the event is fully applied
/// or explicitly skipped; rows are never deleted (audit trail).
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub topic: String,
    pub resource_id: String,
    pub raw_payload: serde_json::Value,
    pub received_at: Option<NaiveDateTime>,
    pub processed_at: Option<NaiveDateTime>,
    pub applied: bool,
    pub tenant_id: Option<i64>,
    pub intent_id: Option<Uuid>,
}
