use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{CreateSignupIntentInput, SignupIntentRepo},
    domain::entities::signup_intent::SignupIntent,
};

fn row_to_intent(row: &sqlx::postgres::PgRow) -> SignupIntent {
    SignupIntent {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        plan_id: row.get("plan_id"),
        status: row.get("status"),
        external_subscription_id: row.get("external_subscription_id"),
        external_reference: row.get("external_reference"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, email, password_hash, plan_id, status, external_subscription_id,
    external_reference, created_at, updated_at
"#;

#[async_trait]
impl SignupIntentRepo for PostgresPersistence {
    async fn create(&self, input: &CreateSignupIntentInput) -> AppResult<SignupIntent> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO signup_intents (id, email, password_hash, plan_id, external_reference)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(input.plan_id)
        .bind(&input.external_reference)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_intent(&row))
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<SignupIntent>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM signup_intents WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_intent))
    }

    async fn set_pending(&self, id: Uuid, external_subscription_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE signup_intents
            SET status = 'pending', external_subscription_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(external_subscription_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_failed(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE signup_intents SET status = 'failed', updated_at = NOW() WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn apply_approval(
        &self,
        event_id: &str,
        id: Uuid,
        external_subscription_id: &str,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE signup_intents
            SET status = 'approved', external_subscription_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(external_subscription_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE processed_events
            SET processed_at = NOW(), applied = TRUE, intent_id = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}
