//! Worker settings loaded from the environment.

use core_config::{ConfigError, FromEnv, env_optional, env_parse};
use domain_notifications::EmailQueues;
use queue_worker::{QueueDef, WorkerConfig};
use std::time::Duration;

const DEFAULT_REDIS_URL: &str = "redis://redis";
const DEFAULT_HEALTH_PORT: u16 = 8081;

/// Settings that are not part of the mailer.
///
/// Queue names and limits default to the [`EmailQueues`] definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSettings {
    /// `REDIS_URL`, falling back to `REDIS_HOST`
    pub redis_url: String,
    pub pending_queue: String,
    pub in_flight_queue: String,
    pub error_queue: String,
    pub max_retries: u32,
    pub backoff: Duration,
    pub block_timeout: Duration,
    pub health_port: u16,
}

impl FromEnv for WorkerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let redis_url = env_optional("REDIS_URL")
            .or_else(|| env_optional("REDIS_HOST"))
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        Ok(Self {
            redis_url,
            pending_queue: queue_name("EMAIL_QUEUE_PENDING", EmailQueues::PENDING_QUEUE),
            in_flight_queue: queue_name("EMAIL_QUEUE_IN_FLIGHT", EmailQueues::IN_FLIGHT_QUEUE),
            error_queue: queue_name("EMAIL_QUEUE_ERROR", EmailQueues::ERROR_QUEUE),
            max_retries: env_parse("EMAIL_MAX_RETRIES", EmailQueues::MAX_RETRIES)?,
            backoff: Duration::from_secs(env_parse(
                "EMAIL_BACKOFF_SECS",
                EmailQueues::BACKOFF_SECS,
            )?),
            block_timeout: Duration::from_secs(env_parse(
                "EMAIL_BLOCK_TIMEOUT_SECS",
                EmailQueues::BLOCK_TIMEOUT_SECS,
            )?),
            health_port: env_parse("HEALTH_PORT", DEFAULT_HEALTH_PORT)?,
        })
    }
}

impl WorkerSettings {
    /// Queue worker configuration for these settings.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::new(
            &self.pending_queue,
            &self.in_flight_queue,
            &self.error_queue,
        )
        .with_max_retries(self.max_retries)
        .with_backoff(self.backoff)
        .with_block_timeout(self.block_timeout)
    }
}

fn queue_name(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 9] = [
        "REDIS_URL",
        "REDIS_HOST",
        "EMAIL_QUEUE_PENDING",
        "EMAIL_QUEUE_IN_FLIGHT",
        "EMAIL_QUEUE_ERROR",
        "EMAIL_MAX_RETRIES",
        "EMAIL_BACKOFF_SECS",
        "EMAIL_BLOCK_TIMEOUT_SECS",
        "HEALTH_PORT",
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(VARS, || {
            let settings = WorkerSettings::from_env().unwrap();
            assert_eq!(settings.redis_url, "redis://redis");
            assert_eq!(settings.pending_queue, "email:send");
            assert_eq!(settings.in_flight_queue, "email:processing");
            assert_eq!(settings.error_queue, "email:error");
            assert_eq!(settings.max_retries, 3);
            assert_eq!(settings.backoff, Duration::from_secs(5));
            assert_eq!(settings.block_timeout, Duration::from_secs(1));
            assert_eq!(settings.health_port, 8081);
        });
    }

    #[test]
    fn test_redis_host_fallback() {
        temp_env::with_vars(
            [
                ("REDIS_URL", None),
                ("REDIS_HOST", Some("redis://cache:6379")),
            ],
            || {
                let settings = WorkerSettings::from_env().unwrap();
                assert_eq!(settings.redis_url, "redis://cache:6379");
            },
        );

        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://primary")),
                ("REDIS_HOST", Some("redis://cache:6379")),
            ],
            || {
                assert_eq!(WorkerSettings::from_env().unwrap().redis_url, "redis://primary");
            },
        );
    }

    #[test]
    fn test_overrides_flow_into_worker_config() {
        temp_env::with_vars(
            [
                ("EMAIL_QUEUE_PENDING", Some("mail:in")),
                ("EMAIL_QUEUE_IN_FLIGHT", Some("mail:busy")),
                ("EMAIL_QUEUE_ERROR", Some("mail:dead")),
                ("EMAIL_MAX_RETRIES", Some("7")),
                ("EMAIL_BACKOFF_SECS", Some("2")),
                ("EMAIL_BLOCK_TIMEOUT_SECS", Some("0")),
            ],
            || {
                let config = WorkerSettings::from_env().unwrap().worker_config();
                assert_eq!(config.pending_queue, "mail:in");
                assert_eq!(config.in_flight_queue, "mail:busy");
                assert_eq!(config.error_queue, "mail:dead");
                assert_eq!(config.max_retries, 7);
                assert_eq!(config.backoff, Duration::from_secs(2));
                assert_eq!(config.block_timeout, Duration::ZERO);
            },
        );
    }

    #[test]
    fn test_invalid_number() {
        temp_env::with_var("EMAIL_MAX_RETRIES", Some("three"), || {
            let err = WorkerSettings::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { key, .. } if key == "EMAIL_MAX_RETRIES"));
        });
    }
}
