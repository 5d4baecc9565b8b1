use sqlx::PgPool;

use crate::app_error::AppError;

pub mod processed_event;
pub mod signup_intent;
pub mod subscription_plan;
pub mod tenant_billing;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::Conflict("A record with this value already exists".into())
                } else if msg.contains("foreign key") || msg.contains("violates foreign key") {
                    AppError::InvalidInput("Referenced record not found".into())
                } else {
                    // Log the actual error for debugging, but don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
