//! Redis queue store tests. These start a Redis container and need Docker:
//!
//! ```sh
//! cargo test -p queue-worker --test redis_store_test -- --ignored
//! ```

use queue_worker::{QueueStore, RedisQueueStore, RetryConfig};
use std::time::Duration;
use test_utils::{TestDataBuilder, TestRedis};

async fn store(redis: &TestRedis) -> RedisQueueStore {
    RedisQueueStore::connect_with_retry(redis.connection_string(), RetryConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_push_pop_is_fifo() {
    let redis = TestRedis::new().await;
    let store = store(&redis).await;
    let (pending, _, _) = TestDataBuilder::from_test_name("fifo").queues("email");

    store.push(&pending, "first").await.unwrap();
    store.push(&pending, "second").await.unwrap();

    assert_eq!(redis.list(&pending).await, vec!["second", "first"]);
    assert_eq!(store.pop(&pending).await.unwrap().as_deref(), Some("first"));
    assert_eq!(store.len(&pending).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_blocking_move_claims_and_times_out() {
    let redis = TestRedis::new().await;
    let store = store(&redis).await;
    let (pending, in_flight, _) = TestDataBuilder::from_test_name("claim").queues("email");

    store.push(&pending, "job").await.unwrap();
    let moved = store
        .blocking_move(&pending, &in_flight, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(moved.as_deref(), Some("job"));
    assert_eq!(redis.list(&in_flight).await, vec!["job"]);

    let empty = store
        .blocking_move(&pending, &in_flight, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(empty, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_blocking_move_does_not_stall_other_commands() {
    let redis = TestRedis::new().await;
    let store = std::sync::Arc::new(store(&redis).await);
    let (pending, in_flight, _) = TestDataBuilder::from_test_name("stall").queues("email");

    let waiter = {
        let store = std::sync::Arc::clone(&store);
        let (pending, in_flight) = (pending.clone(), in_flight.clone());
        tokio::spawn(async move {
            store
                .blocking_move(&pending, &in_flight, Duration::from_secs(5))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Served by the command connection while BLMOVE is parked
    tokio::time::timeout(Duration::from_secs(1), store.push(&pending, "wake"))
        .await
        .expect("push stalled behind BLMOVE")
        .unwrap();

    let moved = waiter.await.unwrap().unwrap();
    assert_eq!(moved.as_deref(), Some("wake"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rotate_and_remove() {
    let redis = TestRedis::new().await;
    let store = store(&redis).await;
    let (_, _, error) = TestDataBuilder::from_test_name("rotate").queues("email");

    store.push(&error, "a").await.unwrap();
    store.push(&error, "b").await.unwrap();

    assert_eq!(store.try_move(&error, &error).await.unwrap().as_deref(), Some("a"));
    assert_eq!(redis.list(&error).await, vec!["a", "b"]);

    assert_eq!(store.remove(&error, "a").await.unwrap(), 1);
    assert_eq!(store.remove(&error, "a").await.unwrap(), 0);
    assert_eq!(redis.list(&error).await, vec!["b"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_transfer_is_conditional() {
    let redis = TestRedis::new().await;
    let store = store(&redis).await;
    let (pending, in_flight, error) = TestDataBuilder::from_test_name("transfer").queues("email");

    store.push(&in_flight, "raw").await.unwrap();

    assert!(store.transfer(&in_flight, "raw", &error, "envelope").await.unwrap());
    assert!(redis.list(&in_flight).await.is_empty());
    assert_eq!(redis.list(&error).await, vec!["envelope"]);

    assert!(!store.transfer(&in_flight, "raw", &pending, "again").await.unwrap());
    assert!(redis.list(&pending).await.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_ping() {
    let redis = TestRedis::new().await;
    let store = store(&redis).await;

    store.ping().await.unwrap();
    assert_eq!(store.name(), "redis");
}
