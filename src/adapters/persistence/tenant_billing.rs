use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{BillingStateUpdate, TenantBillingRepo},
    domain::entities::tenant_billing::TenantBillingState,
};

fn row_to_state(row: &sqlx::postgres::PgRow) -> TenantBillingState {
    TenantBillingState {
        tenant_id: row.get("tenant_id"),
        subscription_status: row.get("subscription_status"),
        subscription_plan_id: row.get("subscription_plan_id"),
        external_subscription_id: row.get("external_subscription_id"),
        trial_ends_at: row.get("trial_ends_at"),
        current_period_end: row.get("current_period_end"),
        subscription_started_at: row.get("subscription_started_at"),
        last_event_at: row.get("last_event_at"),
    }
}

const SELECT_COLS: &str = r#"
    tenant_id, subscription_status, subscription_plan_id, external_subscription_id,
    trial_ends_at, current_period_end, subscription_started_at, last_event_at
"#;

// Overwrite semantics: status and current_period_end always take the new
// value, plan/external id keep the stored value when the update carries
// none, and subscription_started_at is stamped only on the first transition
// into active.
const UPDATE_STATE_SQL: &str = r#"
    UPDATE tenant_billing_state SET
        subscription_status = $2,
        subscription_plan_id = COALESCE($3, subscription_plan_id),
        external_subscription_id = COALESCE($4, external_subscription_id),
        current_period_end = $5,
        subscription_started_at = CASE
            WHEN $2 = 'active'::subscription_status AND subscription_started_at IS NULL
            THEN NOW()
            ELSE subscription_started_at
        END,
        last_event_at = NOW()
    WHERE tenant_id = $1
"#;

#[async_trait]
impl TenantBillingRepo for PostgresPersistence {
    async fn get(&self, tenant_id: i64) -> AppResult<Option<TenantBillingState>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tenant_billing_state WHERE tenant_id = $1",
            SELECT_COLS
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_state))
    }

    async fn apply_update(
        &self,
        tenant_id: i64,
        update: &BillingStateUpdate,
    ) -> AppResult<TenantBillingState> {
        let row = sqlx::query(&format!("{} RETURNING {}", UPDATE_STATE_SQL, SELECT_COLS))
            .bind(tenant_id)
            .bind(update.status)
            .bind(update.plan_id)
            .bind(&update.external_subscription_id)
            .bind(update.current_period_end)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        row.as_ref().map(row_to_state).ok_or(AppError::NotFound)
    }

    async fn apply_reconciliation(
        &self,
        event_id: &str,
        tenant_id: i64,
        update: &BillingStateUpdate,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let result = sqlx::query(UPDATE_STATE_SQL)
            .bind(tenant_id)
            .bind(update.status)
            .bind(update.plan_id)
            .bind(&update.external_subscription_id)
            .bind(update.current_period_end)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE processed_events
            SET processed_at = NOW(), applied = TRUE, tenant_id = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    async fn list_stale_pending(
        &self,
        cutoff: NaiveDateTime,
    ) -> AppResult<Vec<TenantBillingState>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM tenant_billing_state
            WHERE subscription_status = 'pending'
              AND external_subscription_id IS NOT NULL
              AND last_event_at < $1
            "#,
            SELECT_COLS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_state).collect())
    }
}
