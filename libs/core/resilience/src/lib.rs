//! Resilience primitives shared by the services.
//!
//! - [`CircuitBreaker`]: sliding-window breaker (count or time based) that
//!   trips on failure rate or slow-call rate and short-circuits while open.
//! - [`retry_with_backoff`]: exponential backoff retry for transient failures.

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod retry;

pub use circuit_breaker::{BreakerMetrics, CircuitBreaker, CircuitState};
pub use config::{CircuitBreakerConfig, SlidingWindow};
pub use error::CallError;
pub use retry::{RetryConfig, retry, retry_if, retry_with_backoff};
