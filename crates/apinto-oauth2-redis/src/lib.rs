//! Redis storage backend for apinto-oauth2.
//!
//! [`RedisTokenStore`] implements [`TokenStore`] over a `deadpool-redis`
//! connection pool so that every gateway instance sharing the Redis server
//! sees the same credential records.
//!
//! | Operation    | Redis commands                      |
//! |--------------|-------------------------------------|
//! | `set_fields` | `MULTI` / `HSET` / `EXPIRE` / `EXEC` |
//! | `get_fields` | `HMGET`                             |
//! | `delete`     | `DEL`                               |
//! | `scan_keys`  | `SCAN ... MATCH ... COUNT`          |
//!
//! Every call, including waiting for a pooled connection, is bounded by the
//! configured timeout. Dropping the returned future abandons the call.
//!
//! # Example
//!
//! ```ignore
//! use apinto_oauth2_redis::{RedisStoreConfig, RedisTokenStore};
//!
//! let store = RedisTokenStore::connect(&RedisStoreConfig {
//!     url: "redis://127.0.0.1:6379".into(),
//!     ..Default::default()
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use apinto_oauth2::{OAuth2Error, OAuth2Result, TokenStore};
use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;

const SCAN_COUNT: usize = 100;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the Redis backend.
#[derive(Debug, thiserror::Error)]
pub enum RedisStoreError {
    /// The pool could not be built from the configuration.
    #[error("redis pool configuration error: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    /// No connection could be taken from the pool.
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Redis rejected or failed a command.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The call did not finish in time.
    #[error("redis call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<RedisStoreError> for OAuth2Error {
    fn from(err: RedisStoreError) -> Self {
        OAuth2Error::storage(err.to_string())
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for [`RedisTokenStore`].
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: usize,
    /// Bound on every call and on pool waits, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
            timeout_ms: 2000,
        }
    }
}

impl RedisStoreConfig {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// Redis Token Store
// =============================================================================

/// [`TokenStore`] backed by Redis hashes.
#[derive(Clone)]
pub struct RedisTokenStore {
    pool: Pool,
    timeout: Duration,
}

impl RedisTokenStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Build a pool from `config` without contacting Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or pool settings are invalid.
    pub fn from_config(config: &RedisStoreConfig) -> Result<Self, RedisStoreError> {
        let timeout = config.timeout();
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let pool_config = redis_config.pool.get_or_insert_with(PoolConfig::default);
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self::new(pool, timeout))
    }

    /// Build a pool from `config` and check that Redis answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built or no connection can be
    /// established within the timeout.
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self, RedisStoreError> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let store = Self::from_config(config)?;

        let ping = async {
            let mut conn = store.pool.get().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, RedisStoreError>(())
        };
        tokio::time::timeout(store.timeout, ping)
            .await
            .map_err(|_| RedisStoreError::Timeout(store.timeout))??;

        tracing::info!("Connected to Redis");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn run<T, F>(&self, command: &'static str, key: &str, call: F) -> OAuth2Result<T>
    where
        F: Future<Output = Result<T, RedisStoreError>> + Send,
    {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RedisStoreError::Timeout(self.timeout)),
        };
        result.map_err(|e| {
            tracing::warn!(command, key = %key, error = %e, "Redis call failed");
            OAuth2Error::storage(format!("{command} {key}: {e}"))
        })
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn set_fields(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Option<Duration>,
    ) -> OAuth2Result<()> {
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();

        self.run("HSET", key, async {
            let mut conn = self.pool.get().await?;
            let mut pipe = redis::pipe();
            pipe.atomic();
            if !items.is_empty() {
                pipe.hset_multiple(key, &items).ignore();
            }
            if let Some(ttl) = ttl {
                let seconds = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
                pipe.expire(key, seconds).ignore();
            }
            let () = pipe.query_async(&mut conn).await?;
            Ok::<_, RedisStoreError>(())
        })
        .await
    }

    async fn get_fields(&self, key: &str, names: &[&str]) -> OAuth2Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        self.run("HMGET", key, async {
            let mut conn = self.pool.get().await?;
            let values: Vec<Option<String>> = redis::cmd("HMGET")
                .arg(key)
                .arg(names)
                .query_async(&mut conn)
                .await?;
            Ok::<_, RedisStoreError>(values.into_iter().map(Option::unwrap_or_default).collect())
        })
        .await
    }

    async fn delete(&self, key: &str) -> OAuth2Result<()> {
        self.run("DEL", key, async {
            let mut conn = self.pool.get().await?;
            let _removed: i64 = conn.del(key).await?;
            Ok::<_, RedisStoreError>(())
        })
        .await
    }

    async fn scan_keys(&self, pattern: &str) -> OAuth2Result<Vec<String>> {
        self.run("SCAN", pattern, async {
            let mut conn = self.pool.get().await?;
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query_async(&mut conn)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            // SCAN may return a key more than once.
            keys.sort();
            keys.dedup();
            Ok::<_, RedisStoreError>(keys)
        })
        .await
    }
}
