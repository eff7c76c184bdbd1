use core_config::{ConfigError, env_parse};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff settings
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (typically 2.0)
    pub backoff_multiplier: f64,

    /// Whether to add jitter to prevent thundering herd
    pub use_jitter: bool,
}

impl RetryConfig {
    /// Defaults: 3 retries, 100ms initial, 5s max, x2, jitter on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker publish budget: 3 retries backing off from 1s up to 10s.
    pub fn kafka_publish() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            use_jitter: false,
        }
    }

    /// Read `KAFKA_RETRIES`, `KAFKA_RETRY_BACKOFF_MS` and `KAFKA_RETRY_BACKOFF_MAX_MS`
    /// on top of [`RetryConfig::kafka_publish`].
    pub fn kafka_publish_from_env() -> Result<Self, ConfigError> {
        let defaults = Self::kafka_publish();
        Ok(defaults
            .clone()
            .with_max_retries(env_parse("KAFKA_RETRIES", defaults.max_retries)?)
            .with_initial_delay(env_parse("KAFKA_RETRY_BACKOFF_MS", defaults.initial_delay_ms)?)
            .with_max_delay(env_parse("KAFKA_RETRY_BACKOFF_MAX_MS", defaults.max_delay_ms)?))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Delay before retry number `retry` (1-based), before jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis((raw as u64).min(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Retry an async operation with exponential backoff, retrying every error.
///
/// ```ignore
/// let config = RetryConfig::new().with_max_retries(5);
/// let db = retry_with_backoff(|| connect_from_config(pg.clone()), &config).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(operation, config, |_| true).await
}

/// Like [`retry_with_backoff`], but only errors for which `is_retryable` returns
/// `true` are retried; anything else is returned immediately.
pub async fn retry_if<F, Fut, T, E, P>(
    mut operation: F,
    config: &RetryConfig,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(retries = attempt, "Operation succeeded after retries");
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => {
                debug!(error = %e, "Operation failed with non-retryable error");
                return Err(e);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    warn!(attempts = attempt, error = %e, "Operation failed, retries exhausted");
                    return Err(e);
                }

                let delay = config.delay_for(attempt);
                let delay = if config.use_jitter {
                    apply_jitter(delay)
                } else {
                    delay
                };

                debug!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Scale the delay to a random 50-100% of its value
fn apply_jitter(delay: Duration) -> Duration {
    let factor = rand::rng().random_range(0.5..=1.0);
    delay.mul_f64(factor)
}

/// Retry with [`RetryConfig::default`].
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, &RetryConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(|| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("success")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let config = RetryConfig::new().with_initial_delay(10).without_jitter();

        let result = retry_with_backoff(
            || {
                let counter = counter_clone.clone();
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(format!("Attempt {}", count + 1))
                    } else {
                        Ok("success")
                    }
                }
            },
            &config,
        )
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_max_retries_exceeded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let config = RetryConfig::new()
            .with_max_retries(2)
            .with_initial_delay(5)
            .without_jitter();

        let result = retry_with_backoff(
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<String, _>("always fails")
                }
            },
            &config,
        )
        .await;

        assert_eq!(result.unwrap_err(), "always fails");
        assert_eq!(counter.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn test_retry_if_stops_on_non_retryable() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let config = RetryConfig::new().with_initial_delay(5).without_jitter();

        let result = retry_if(
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("fatal")
                }
            },
            &config,
            |e| *e != "fatal",
        )
        .await;

        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kafka_publish_backoff_is_capped() {
        let config = RetryConfig::kafka_publish();
        assert_eq!(config.delay_for(1), Duration::from_secs(1));
        assert_eq!(config.delay_for(2), Duration::from_secs(2));
        assert_eq!(config.delay_for(3), Duration::from_secs(4));
        assert_eq!(config.delay_for(5), Duration::from_secs(10));
    }

    #[test]
    fn test_kafka_publish_from_env() {
        temp_env::with_vars(
            [
                ("KAFKA_RETRIES", Some("5")),
                ("KAFKA_RETRY_BACKOFF_MS", Some("200")),
                ("KAFKA_RETRY_BACKOFF_MAX_MS", None),
            ],
            || {
                let config = RetryConfig::kafka_publish_from_env().unwrap();
                assert_eq!(config.max_retries, 5);
                assert_eq!(config.initial_delay_ms, 200);
                assert_eq!(config.max_delay_ms, 10_000);
            },
        );
    }

    #[test]
    fn test_apply_jitter() {
        let delay = Duration::from_millis(1000);
        for _ in 0..10 {
            let jittered = apply_jitter(delay);
            assert!(jittered >= Duration::from_millis(500));
            assert!(jittered <= delay);
        }
    }

    #[tokio::test]
    async fn test_exponential_backoff_waits() {
        let config = RetryConfig::new()
            .with_max_retries(3)
            .with_initial_delay(20)
            .without_jitter();
        let start = std::time::Instant::now();

        let _ = retry_with_backoff(|| async { Err::<(), _>("fail") }, &config).await;

        // 20 + 40 + 80
        assert!(start.elapsed() >= Duration::from_millis(140));
    }
}
