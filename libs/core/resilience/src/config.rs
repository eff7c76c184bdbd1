//! Breaker configuration and the presets used by the services.

use core_config::{ConfigError, env_or_default, env_parse};
use std::time::Duration;

/// How outcomes are aggregated before rates are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidingWindow {
    /// The last `n` recorded calls.
    Count(usize),
    /// Calls recorded within the trailing duration.
    Time(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    pub sliding_window: SlidingWindow,
    /// Calls required in the window before rates are evaluated.
    pub minimum_calls: usize,
    /// Failure percentage (0-100) at or above which the breaker opens.
    pub failure_rate_threshold: f32,
    /// Slow-call percentage (0-100) at or above which the breaker opens.
    pub slow_call_rate_threshold: f32,
    pub slow_call_duration: Duration,
    pub wait_in_open: Duration,
    pub permitted_calls_in_half_open: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window: SlidingWindow::Count(100),
            minimum_calls: 100,
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration: Duration::from_secs(60),
            wait_in_open: Duration::from_secs(60),
            permitted_calls_in_half_open: 10,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guards event publishing to the broker.
    pub fn kafka_publisher() -> Self {
        Self {
            sliding_window: SlidingWindow::Count(5),
            minimum_calls: 5,
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 65.0,
            slow_call_duration: Duration::from_secs(2),
            wait_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 3,
        }
    }

    /// Guards the user store.
    pub fn user_database() -> Self {
        Self {
            slow_call_duration: Duration::from_secs(3),
            ..Self::kafka_publisher()
        }
    }

    /// Guards the send-and-record pipeline.
    pub fn mail() -> Self {
        Self {
            sliding_window: SlidingWindow::Time(Duration::from_secs(5)),
            minimum_calls: 3,
            failure_rate_threshold: 50.0,
            wait_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 3,
            ..Self::default()
        }
    }

    /// Guards the notification record store.
    pub fn notification_database() -> Self {
        Self {
            failure_rate_threshold: 70.0,
            ..Self::mail()
        }
    }

    pub fn with_sliding_window(mut self, window: SlidingWindow) -> Self {
        self.sliding_window = window;
        self
    }

    pub fn with_minimum_calls(mut self, calls: usize) -> Self {
        self.minimum_calls = calls.max(1);
        self
    }

    pub fn with_failure_rate_threshold(mut self, rate: f32) -> Self {
        self.failure_rate_threshold = rate.clamp(0.0, 100.0);
        self
    }

    pub fn with_slow_calls(mut self, rate: f32, duration: Duration) -> Self {
        self.slow_call_rate_threshold = rate.clamp(0.0, 100.0);
        self.slow_call_duration = duration;
        self
    }

    pub fn with_wait_in_open(mut self, wait: Duration) -> Self {
        self.wait_in_open = wait;
        self
    }

    pub fn with_permitted_calls_in_half_open(mut self, calls: usize) -> Self {
        self.permitted_calls_in_half_open = calls.max(1);
        self
    }

    /// Number of buffered calls needed before the closed state evaluates rates.
    pub(crate) fn effective_minimum_calls(&self) -> usize {
        match self.sliding_window {
            SlidingWindow::Count(size) => self.minimum_calls.min(size).max(1),
            SlidingWindow::Time(_) => self.minimum_calls.max(1),
        }
    }

    /// Override `defaults` with `CB_<PREFIX>_*` environment variables.
    ///
    /// Recognized suffixes: `WINDOW_TYPE` (`COUNT`/`TIME`), `WINDOW_SIZE` (calls or
    /// seconds), `MIN_CALLS`, `FAILURE_RATE`, `SLOW_CALL_RATE`,
    /// `SLOW_CALL_DURATION_MS`, `WAIT_OPEN_MS`, `HALF_OPEN_CALLS`.
    pub fn from_env_with_prefix(prefix: &str, defaults: Self) -> Result<Self, ConfigError> {
        let key = |suffix: &str| format!("CB_{}_{}", prefix.to_ascii_uppercase(), suffix);

        let (default_kind, default_size) = match defaults.sliding_window {
            SlidingWindow::Count(size) => ("COUNT", size as u64),
            SlidingWindow::Time(duration) => ("TIME", duration.as_secs()),
        };
        let kind_key = key("WINDOW_TYPE");
        let kind = env_or_default(&kind_key, default_kind).to_ascii_uppercase();
        let size: u64 = env_parse(&key("WINDOW_SIZE"), default_size)?;
        let sliding_window = match kind.as_str() {
            "COUNT" => SlidingWindow::Count(size.max(1) as usize),
            "TIME" => SlidingWindow::Time(Duration::from_secs(size.max(1))),
            other => {
                return Err(ConfigError::ParseError {
                    key: kind_key,
                    details: format!("unknown sliding window type '{other}'"),
                });
            }
        };

        let slow_call_ms: u64 = env_parse(
            &key("SLOW_CALL_DURATION_MS"),
            defaults.slow_call_duration.as_millis() as u64,
        )?;
        let wait_ms: u64 = env_parse(
            &key("WAIT_OPEN_MS"),
            defaults.wait_in_open.as_millis() as u64,
        )?;

        Ok(Self::new()
            .with_sliding_window(sliding_window)
            .with_minimum_calls(env_parse(&key("MIN_CALLS"), defaults.minimum_calls)?)
            .with_failure_rate_threshold(env_parse(
                &key("FAILURE_RATE"),
                defaults.failure_rate_threshold,
            )?)
            .with_slow_calls(
                env_parse(&key("SLOW_CALL_RATE"), defaults.slow_call_rate_threshold)?,
                Duration::from_millis(slow_call_ms),
            )
            .with_wait_in_open(Duration::from_millis(wait_ms))
            .with_permitted_calls_in_half_open(env_parse(
                &key("HALF_OPEN_CALLS"),
                defaults.permitted_calls_in_half_open,
            )?))
    }
}
