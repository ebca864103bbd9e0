//! # Runtime Configuration
//!
//! Configuration for the step-execution runtime: database, work queue, step lock,
//! inter-step scheduling delays, and completion webhook delivery. Defaults suit
//! local development; `from_env()` applies environment overrides and
//! `for_testing()` shrinks every delay so test suites run fast.

use std::time::Duration;

use crate::error::{RuntimeError, RuntimeResult};

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Postgres connection string for the state store, lock table, and pgmq.
    pub database_url: String,
    /// Step lock lease. Must exceed the longest expected single step; a crashed
    /// holder blocks its step until this expires.
    pub lock_ttl: Duration,
    /// Delay before the first step of an auto-started operation.
    pub initial_step_delay: Duration,
    /// Work queue settings.
    pub queue: QueueSettings,
    /// Inter-step scheduling behavior.
    pub scheduling: SchedulingSettings,
    /// Completion webhook timeout. Delivery is a single attempt.
    pub webhook_timeout: Duration,
    /// Broadcast capacity for the event stream.
    pub event_channel_capacity: usize,
}

/// Settings for the pgmq-backed work queue.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Queue name step messages are scheduled onto.
    pub endpoint: String,
    /// Visibility timeout applied when a worker reads a batch.
    pub visibility_timeout: Duration,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
    /// Messages read per poll.
    pub batch_size: usize,
    /// Deliveries allowed before a message is archived as poisoned.
    pub max_delivery_attempts: u32,
}

/// Settings for planning the delay and priority of the next step.
#[derive(Debug, Clone)]
pub struct SchedulingSettings {
    /// Base delay between consecutive steps.
    pub base_step_delay: Duration,
    /// Extra delay added when the finished step produced tool traffic.
    pub tool_call_delay: Duration,
    /// First backoff interval when the finished step reported errors.
    pub backoff_base: Duration,
    /// Cap for error backoff.
    pub backoff_max: Duration,
    /// Multiplier applied per additional error event.
    pub backoff_multiplier: f64,
    /// Apply up to 10% random jitter to error backoff.
    pub backoff_jitter: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/agentrun_development".to_string(),
            lock_ttl: Duration::from_secs(35),
            initial_step_delay: Duration::from_millis(250),
            queue: QueueSettings::default(),
            scheduling: SchedulingSettings::default(),
            webhook_timeout: Duration::from_secs(10),
            event_channel_capacity: 1024,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            endpoint: crate::constants::DEFAULT_STEP_QUEUE.to_string(),
            visibility_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            max_delivery_attempts: 3,
        }
    }
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            base_step_delay: Duration::from_millis(100),
            tool_call_delay: Duration::from_millis(500),
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            backoff_jitter: true,
        }
    }
}

impl RuntimeConfig {
    /// Build configuration from environment variables, falling back to defaults.
    pub fn from_env() -> RuntimeResult<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(ttl) = std::env::var("AGENTRUN_LOCK_TTL_SECONDS") {
            let seconds: u64 = ttl.parse().map_err(|e| {
                RuntimeError::configuration(format!("Invalid AGENTRUN_LOCK_TTL_SECONDS: {e}"))
            })?;
            config.lock_ttl = Duration::from_secs(seconds);
        }

        if let Ok(endpoint) = std::env::var("AGENTRUN_STEP_QUEUE") {
            config.queue.endpoint = endpoint;
        }

        if let Ok(batch) = std::env::var("AGENTRUN_QUEUE_BATCH_SIZE") {
            config.queue.batch_size = batch.parse().map_err(|e| {
                RuntimeError::configuration(format!("Invalid AGENTRUN_QUEUE_BATCH_SIZE: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Configuration with short delays for test suites.
    pub fn for_testing() -> Self {
        Self {
            database_url: "postgresql://localhost/agentrun_test".to_string(),
            lock_ttl: Duration::from_secs(2),
            initial_step_delay: Duration::ZERO,
            queue: QueueSettings {
                endpoint: "agent_operation_steps_test".to_string(),
                visibility_timeout: Duration::from_secs(2),
                poll_interval: Duration::from_millis(20),
                batch_size: 5,
                max_delivery_attempts: 2,
            },
            scheduling: SchedulingSettings {
                base_step_delay: Duration::ZERO,
                tool_call_delay: Duration::from_millis(5),
                backoff_base: Duration::from_millis(10),
                backoff_max: Duration::from_millis(80),
                backoff_multiplier: 2.0,
                backoff_jitter: false,
            },
            webhook_timeout: Duration::from_secs(2),
            event_channel_capacity: 64,
        }
    }

    /// Reject configurations the runtime cannot operate under.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.lock_ttl.is_zero() {
            return Err(RuntimeError::configuration(
                "lock_ttl must be positive, a zero lease can never be claimed",
            ));
        }
        if self.queue.endpoint.is_empty() {
            return Err(RuntimeError::configuration(
                "queue.endpoint must not be empty",
            ));
        }
        if self.queue.batch_size == 0 {
            return Err(RuntimeError::configuration(
                "queue.batch_size must be at least 1",
            ));
        }
        if self.scheduling.backoff_multiplier < 1.0 {
            return Err(RuntimeError::configuration(
                "scheduling.backoff_multiplier must be >= 1.0",
            ));
        }
        Ok(())
    }
}
