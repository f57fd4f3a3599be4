//! Redis-backed fixed-window counter store.

use super::service::{RateLimitBackend, RateLimitError, RateLimitResult};
use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Increments the window counter and sets its expiry on the first hit only,
/// in one atomic step on the server.
const WINDOW_SCRIPT: &str = r#"
local current = redis.call("INCR", KEYS[1])
if current == 1 then
  redis.call("EXPIRE", KEYS[1], tonumber(ARGV[1]))
end
return current
"#;

/// Counter store shared by every instance of the service through Redis.
///
/// Keys are `{prefix}:{bucket}:{client_key}` where `bucket` is the Unix time
/// divided by the window length, so every instance agrees on window
/// boundaries. Each key expires on its own a little after its window ends.
///
/// The connection is opened lazily on first use. A store that is down at
/// startup therefore shows up as backend failures (and degraded mode) rather
/// than a refusal to boot.
pub struct RedisBackend {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    script: Script,
    key_prefix: String,
    expiry_seconds: u64,
    health_timeout: Duration,
}

impl RedisBackend {
    /// Creates the backend without connecting.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - connection string (e.g., `"redis://localhost:6379/0"`)
    /// - `key_prefix` - namespace for counter keys
    /// - `expiry_seconds` - TTL set on a window key at its first increment
    /// - `health_timeout` - upper bound for the readiness PING
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Connection`] if the URL is invalid.
    pub fn new(
        redis_url: &str,
        key_prefix: impl Into<String>,
        expiry_seconds: u64,
        health_timeout: Duration,
    ) -> RateLimitResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            RateLimitError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            script: Script::new(WINDOW_SCRIPT),
            key_prefix: key_prefix.into(),
            expiry_seconds: expiry_seconds.max(1),
            health_timeout,
        })
    }

    async fn connection(&self) -> RateLimitResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| {
                        RateLimitError::Connection(format!("Failed to connect to Redis: {}", e))
                    })?;
                info!("✓ Connected to Redis rate limit store");
                Ok::<_, RateLimitError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }

    /// Builds the namespaced counter key for the window containing `now_secs`.
    fn window_key(&self, client_key: &str, window: Duration, now_secs: i64) -> String {
        let window_secs = window.as_secs().max(1) as i64;
        let bucket = now_secs.max(0) / window_secs;
        format!("{}:{}:{}", self.key_prefix, bucket, client_key)
    }
}

#[async_trait]
impl RateLimitBackend for RedisBackend {
    async fn increment(&self, key: &str, window: Duration) -> RateLimitResult<u64> {
        let redis_key = self.window_key(key, window, Utc::now().timestamp());
        let ttl = self.expiry_seconds.max(window.as_secs());
        let mut conn = self.connection().await?;

        let count: u64 = self
            .script
            .key(&redis_key)
            .arg(ttl)
            .invoke_async(&mut conn)
            .await?;

        debug!(key = %redis_key, count, "Redis window increment");
        Ok(count)
    }

    async fn health_check(&self) -> bool {
        let probe = async {
            let mut conn = self.connection().await?;
            conn.ping::<()>().await?;
            Ok::<_, RateLimitError>(())
        };

        match tokio::time::timeout(self.health_timeout, probe).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Redis rate limit store health check failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    "Redis rate limit store health check timed out after {:?}",
                    self.health_timeout
                );
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
