//! Redis cache implementation.
//!
//! Holds short-lived values (one-time codes, OAuth states) and rate-limit
//! counters behind the [`CacheStore`] trait.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use crate::config::{Config, CACHE_PREFIX_RATE_LIMIT, CACHE_SUFFIX_OTP_ATTEMPTS};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Key-value store with expiry, used for codes, states and rate limiting.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key` for `ttl_seconds`, replacing any previous value.
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> AppResult<()>;

    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Atomically read and delete `key`. Only one caller sees the value.
    async fn take(&self, key: &str) -> AppResult<Option<String>>;

    /// Increment the counter under `key`, starting a `ttl_seconds` window on
    /// the first hit. Returns the new count.
    async fn increment(&self, key: &str, ttl_seconds: u64) -> AppResult<u64>;

    /// Check and increment rate limit counter.
    /// Returns (current_count, is_allowed) tuple.
    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)>;

    async fn ping(&self) -> AppResult<()>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis, returning an error instead of panicking.
    pub async fn try_connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for Cache {
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(cache_error)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(cache_error)
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)
    }

    async fn increment(&self, key: &str, ttl_seconds: u64) -> AppResult<u64> {
        let mut conn = self.connection.clone();

        let count: u64 = conn.incr(key, 1u64).await.map_err(cache_error)?;

        // First hit opens the window
        if count == 1 {
            conn.expire::<_, ()>(key, ttl_seconds as i64)
                .await
                .map_err(cache_error)?;
        }

        Ok(count)
    }

    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let count = self.increment(&key, window_seconds).await?;
        Ok((count, count <= max_requests))
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}

/// Cache key for a signup verification code
pub fn signup_otp_key(email: &str) -> String {
    format!("{}{}", crate::config::CACHE_PREFIX_SIGNUP_OTP, email)
}

/// Cache key for a password reset code
pub fn reset_otp_key(email: &str) -> String {
    format!("{}{}", crate::config::CACHE_PREFIX_RESET_OTP, email)
}

/// Cache key counting wrong guesses against the code stored under `code_key`
pub fn otp_attempts_key(code_key: &str) -> String {
    format!("{}{}", code_key, CACHE_SUFFIX_OTP_ATTEMPTS)
}

/// Cache key for a pending OAuth state
pub fn oauth_state_key(state: &str) -> String {
    format!("{}{}", crate::config::CACHE_PREFIX_OAUTH_STATE, state)
}
