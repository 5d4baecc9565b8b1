use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::PlanRepo,
    domain::entities::subscription_plan::Plan,
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> Plan {
    Plan {
        id: row.get("id"),
        key: row.get("key"),
        external_plan_id: row.get("external_plan_id"),
        name: row.get("name"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, key, external_plan_id, name, price_cents, currency, is_active,
    created_at, updated_at
"#;

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_key(&self, key: &str) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            r#"SELECT {} FROM subscription_plans WHERE key = $1"#,
            SELECT_COLS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            r#"SELECT {} FROM subscription_plans WHERE id = $1"#,
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list_active(&self) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM subscription_plans WHERE is_active ORDER BY price_cents"#,
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }
}
