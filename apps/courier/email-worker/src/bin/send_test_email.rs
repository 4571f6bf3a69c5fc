//! Test binary to enqueue a welcome email
//!
//! Run with: cargo run -p courier_email_worker --bin send_test_email -- [to] [name]

use core_config::FromEnv;
use courier_email_worker::config::WorkerSettings;
use domain_notifications::EmailJob;
use eyre::{Result, WrapErr};
use queue_worker::{QueueProducer, QueueStore, RedisQueueStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let mut args = std::env::args().skip(1);
    let to = args.next().unwrap_or_else(|| "test@example.com".to_string());
    let name = args.next().unwrap_or_else(|| "Tester".to_string());

    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker settings")?;
    println!("Connecting to Redis at {}", settings.redis_url);

    let store: Arc<dyn QueueStore> = Arc::new(
        RedisQueueStore::connect(&settings.redis_url)
            .await
            .wrap_err("Failed to connect to Redis")?,
    );
    let producer = QueueProducer::new(Arc::clone(&store), &settings.pending_queue);

    let job = EmailJob::new(&to, "Welcome!", "welcome").with_variable("name", name);
    producer.send(&job).await?;

    println!("Email queued on {} for {}", producer.queue(), to);
    println!("Pending jobs: {}", store.len(producer.queue()).await?);

    Ok(())
}
