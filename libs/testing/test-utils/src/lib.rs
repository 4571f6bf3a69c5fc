//! Shared test utilities for worker testing
//!
//! This crate provides reusable test infrastructure for the worker crates:
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: Deterministic queue names (always available)
//!
//! # Redis Testing
//!
//! Add `features = ["redis"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::TestRedis;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let store = RedisQueueStore::connect(redis.connection_string()).await.unwrap();
//! }
//! ```

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Builder for test data with deterministic randomization
///
/// Tests sharing one Redis instance use it to get queue names that do not
/// collide with each other.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_dispatch_loop");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Queue name unique to this builder
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.queue("email", "send"), "test:email:7:send");
    /// ```
    pub fn queue(&self, prefix: &str, role: &str) -> String {
        format!("test:{}:{}:{}", prefix, self.seed, role)
    }

    /// Pending, in-flight and error queue names sharing one prefix
    pub fn queues(&self, prefix: &str) -> (String, String, String) {
        (
            self.queue(prefix, "send"),
            self.queue(prefix, "processing"),
            self.queue(prefix, "error"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.queues("email"), builder2.queues("email"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.queue("email", "send"), builder2.queue("email", "send"));
    }

    #[test]
    fn test_queue_names_share_prefix() {
        let (pending, in_flight, error) = TestDataBuilder::new(1).queues("email");
        assert_eq!(pending, "test:email:1:send");
        assert_eq!(in_flight, "test:email:1:processing");
        assert_eq!(error, "test:email:1:error");
    }
}
