use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::webhook_processing::ProcessedEventRepo,
    domain::entities::processed_event::ProcessedEvent,
};

fn row_to_event(row: &sqlx::postgres::PgRow) -> ProcessedEvent {
    ProcessedEvent {
        event_id: row.get("event_id"),
        topic: row.get("topic"),
        resource_id: row.get("resource_id"),
        raw_payload: row.get("raw_payload"),
        received_at: row.get("received_at"),
        processed_at: row.get("processed_at"),
        applied: row.get("applied"),
        tenant_id: row.get("tenant_id"),
        intent_id: row.get("intent_id"),
    }
}

const SELECT_COLS: &str = r#"
    event_id, topic, resource_id, raw_payload, received_at, processed_at,
    applied, tenant_id, intent_id
"#;

#[async_trait]
impl ProcessedEventRepo for PostgresPersistence {
    async fn record_if_new(
        &self,
        event_id: &str,
        topic: &str,
        resource_id: &str,
        raw_payload: &serde_json::Value,
    ) -> AppResult<bool> {
        // Single atomic insert: two concurrent deliveries of the same event
        // cannot both observe "not present". rows_affected == 0 means the
        // conflict target already existed.
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, topic, resource_id, raw_payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(topic)
        .bind(resource_id)
        .bind(raw_payload)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        tenant_id: Option<i64>,
        intent_id: Option<Uuid>,
        applied: bool,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE processed_events
            SET processed_at = NOW(), applied = $2, tenant_id = $3, intent_id = $4
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(applied)
        .bind(tenant_id)
        .bind(intent_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn get(&self, event_id: &str) -> AppResult<Option<ProcessedEvent>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM processed_events WHERE event_id = $1",
            SELECT_COLS
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_event))
    }
}
