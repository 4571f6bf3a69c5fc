//! Queue definitions for the notifications domain.

use queue_worker::QueueDef;

/// Email queues.
///
/// Producers push onto `email:send`; the email worker owns the other two.
pub struct EmailQueues;

impl QueueDef for EmailQueues {
    const PENDING_QUEUE: &'static str = "email:send";
    const IN_FLIGHT_QUEUE: &'static str = "email:processing";
    const ERROR_QUEUE: &'static str = "email:error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_queue_def() {
        assert_eq!(EmailQueues::PENDING_QUEUE, "email:send");
        assert_eq!(EmailQueues::IN_FLIGHT_QUEUE, "email:processing");
        assert_eq!(EmailQueues::ERROR_QUEUE, "email:error");
        assert_eq!(EmailQueues::MAX_RETRIES, 3);
        assert_eq!(EmailQueues::BACKOFF_SECS, 5);
    }
}
