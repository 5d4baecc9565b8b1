use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::entities::tenant_billing::SubscriptionStatus;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Payment gateway unavailable: {0}")]
    Upstream(String),

    #[error("An active subscription is required")]
    SubscriptionRequired {
        status: SubscriptionStatus,
        trial_ends_at: Option<NaiveDateTime>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry may succeed. The webhook boundary answers 5xx for
    /// these so the processor re-delivers; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Internal(_)
                | AppError::Upstream(_)
                | AppError::RateLimited
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    RateLimited,
    Unauthorized,
    InvalidInput,
    Conflict,
    NotFound,
    UpstreamError,
    SubscriptionRequired,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::SubscriptionRequired => "SUBSCRIPTION_REQUIRED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
