use super::QueueStore;
use crate::error::WorkerError;
use async_trait::async_trait;
use redis::Client;
use redis::aio::ConnectionManager;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Removes one `ARGV[1]` from `KEYS[1]` and, only if it was there, pushes
/// `ARGV[2]` onto `KEYS[2]`.
const TRANSFER_SCRIPT: &str = r#"
if redis.call('LREM', KEYS[1], 1, ARGV[1]) == 1 then
  redis.call('LPUSH', KEYS[2], ARGV[2])
  return 1
end
return 0
"#;

/// Retry policy for the initial Redis connection
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for the delay between attempts
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-based), doubling each time
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Redis-backed queue store.
///
/// Queues are Redis lists: `push` is `LPUSH`, consumers take from the right
/// with `RPOP`/`LMOVE ... RIGHT LEFT`, so every list is FIFO.
///
/// Two connections are kept:
/// - a `ConnectionManager` for every non-blocking command (shared, reconnects
///   on its own)
/// - a dedicated synchronous connection for `BLMOVE`, driven from the blocking
///   thread pool so a long block never holds up other commands
pub struct RedisQueueStore {
    client: Client,
    commands: ConnectionManager,
    blocking: Arc<Mutex<Option<redis::Connection>>>,
    transfer_script: redis::Script,
}

impl RedisQueueStore {
    /// Connect to Redis and verify the connection with `PING`
    pub async fn connect(url: &str) -> Result<Self, WorkerError> {
        let client = Client::open(url)?;
        let commands = ConnectionManager::new(client.clone()).await?;

        let mut conn = commands.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("Connected to Redis queue store");
        Ok(Self {
            client,
            commands,
            blocking: Arc::new(Mutex::new(None)),
            transfer_script: redis::Script::new(TRANSFER_SCRIPT),
        })
    }

    /// Connect to Redis, retrying with exponential backoff on failure
    pub async fn connect_with_retry(url: &str, retry: RetryConfig) -> Result<Self, WorkerError> {
        let mut attempt = 0;

        loop {
            match Self::connect(url).await {
                Ok(store) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "Connected to Redis after retrying");
                    }
                    return Ok(store);
                }
                Err(e) if attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt,
                        max_retries = retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Redis connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Get a clone of the command connection
    pub fn connection(&self) -> ConnectionManager {
        self.commands.clone()
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push(&self, queue: &str, item: &str) -> Result<(), WorkerError> {
        let mut conn = self.commands.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(queue)
            .arg(item)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn blocking_move(
        &self,
        source: &str,
        dest: &str,
        timeout: Duration,
    ) -> Result<Option<String>, WorkerError> {
        let client = self.client.clone();
        let slot = Arc::clone(&self.blocking);
        let source = source.to_string();
        let dest = dest.to_string();

        tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if guard.is_none() {
                *guard = Some(client.get_connection()?);
            }
            let Some(conn) = guard.as_mut() else {
                return Err(WorkerError::store("blocking connection unavailable"));
            };

            let result: redis::RedisResult<Option<String>> = redis::cmd("BLMOVE")
                .arg(&source)
                .arg(&dest)
                .arg("RIGHT")
                .arg("LEFT")
                .arg(timeout.as_secs_f64())
                .query(conn);

            match result {
                Ok(moved) => Ok(moved),
                Err(e) => {
                    // Reconnect on the next call
                    *guard = None;
                    Err(WorkerError::from(e))
                }
            }
        })
        .await?
    }

    async fn try_move(&self, source: &str, dest: &str) -> Result<Option<String>, WorkerError> {
        let mut conn = self.commands.clone();
        let moved: Option<String> = redis::cmd("LMOVE")
            .arg(source)
            .arg(dest)
            .arg("RIGHT")
            .arg("LEFT")
            .query_async(&mut conn)
            .await?;
        Ok(moved)
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>, WorkerError> {
        let mut conn = self.commands.clone();
        let item: Option<String> = redis::cmd("RPOP").arg(queue).query_async(&mut conn).await?;
        Ok(item)
    }

    async fn remove(&self, queue: &str, item: &str) -> Result<usize, WorkerError> {
        let mut conn = self.commands.clone();
        let removed: usize = redis::cmd("LREM")
            .arg(queue)
            .arg(1)
            .arg(item)
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn transfer(
        &self,
        source: &str,
        item: &str,
        dest: &str,
        replacement: &str,
    ) -> Result<bool, WorkerError> {
        let mut conn = self.commands.clone();
        let moved: i64 = self
            .transfer_script
            .key(source)
            .key(dest)
            .arg(item)
            .arg(replacement)
            .invoke_async(&mut conn)
            .await?;
        Ok(moved == 1)
    }

    async fn len(&self, queue: &str) -> Result<usize, WorkerError> {
        let mut conn = self.commands.clone();
        let len: usize = redis::cmd("LLEN").arg(queue).query_async(&mut conn).await?;
        Ok(len)
    }

    async fn ping(&self) -> Result<(), WorkerError> {
        let mut conn = self.commands.clone();
        let response: String = redis::cmd("PING").query_async(&mut conn).await?;
        if response != "PONG" {
            return Err(WorkerError::store(format!(
                "unexpected PING response: {}",
                response
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_up_to_max() {
        let retry = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(retry.delay_for_attempt(4), Duration::from_millis(500));
    }
}
