use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};

use crate::app_error::{AppError, AppResult};

/// Trait for rate limiting implementations.
#[async_trait]
pub trait RateLimiterTrait: Send + Sync {
    /// Returns Ok(()) if within limits, Err(AppError::RateLimited) if exceeded.
    async fn check(&self, ip: &str) -> AppResult<()>;
}

/// Lua script for atomic increment with TTL.
/// Returns the new count after increment.
/// If the key doesn't exist, it's created with TTL.
/// If the key exists but has no TTL (edge case from old bug), TTL is set.
const INCR_WITH_TTL_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
elseif redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Redis-backed fixed-window limiter for production use.
#[derive(Clone)]
pub struct RedisRateLimiter {
    manager: ConnectionManager,
    window_secs: u64,
    max_per_ip: u64,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(redis_url: &str, window_secs: u64, max_per_ip: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            window_secs,
            max_per_ip,
            script: Script::new(INCR_WITH_TTL_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimiterTrait for RedisRateLimiter {
    async fn check(&self, ip: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let current: u64 = self
            .script
            .key(format!("rate:ip:{ip}"))
            .arg(self.window_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        if current > self.max_per_ip {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}
