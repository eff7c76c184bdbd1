//! Sliding-window circuit breaker.
//!
//! ```text
//! ┌─────────┐  failure or slow-call rate >= threshold  ┌────────┐
//! │ CLOSED  │ ───────────────────────────────────────> │  OPEN  │
//! └─────────┘                                          └────────┘
//!      ^                                                    │
//!      │ trial calls below thresholds                       │ wait_in_open elapsed
//!      │                                                    v
//!      │                                           ┌─────────────┐
//!      └────────────────────────────────────────── │  HALF-OPEN  │
//!                                                  └─────────────┘
//!                         trial calls above thresholds -> OPEN
//! ```
//!
//! ```rust,ignore
//! let breaker = CircuitBreaker::new("kafka", CircuitBreakerConfig::kafka_publisher());
//! let result = breaker.call(|| producer.send(record)).await;
//! ```

use crate::config::{CircuitBreakerConfig, SlidingWindow};
use crate::error::CallError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally and outcomes feed the sliding window.
    Closed,
    /// Calls are rejected until the open-state wait has elapsed.
    Open,
    /// A limited number of trial calls decide whether to close or reopen.
    HalfOpen,
}

impl CircuitState {
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// Point-in-time view of the breaker's window.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerMetrics {
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub slow_calls: usize,
    pub failure_rate: f32,
    pub slow_call_rate: f32,
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    failed: bool,
    slow: bool,
    at: Instant,
}

#[derive(Debug, Default, Clone, Copy)]
struct Rates {
    total: usize,
    failed: usize,
    slow: usize,
}

impl Rates {
    fn of<'a>(outcomes: impl Iterator<Item = &'a Outcome>) -> Self {
        outcomes.fold(Rates::default(), |mut acc, o| {
            acc.total += 1;
            acc.failed += o.failed as usize;
            acc.slow += o.slow as usize;
            acc
        })
    }

    fn failure_rate(&self) -> f32 {
        percentage(self.failed, self.total)
    }

    fn slow_call_rate(&self) -> f32 {
        percentage(self.slow, self.total)
    }
}

fn percentage(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 * 100.0 / total as f32
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Bumped on every transition so late outcomes from a previous state are dropped.
    generation: u64,
    window: VecDeque<Outcome>,
    opened_at: Option<Instant>,
    trials_started: usize,
    trials: Vec<Outcome>,
}

/// Thread-safe circuit breaker guarding one downstream dependency.
///
/// The lock is never held across an `.await`; the guarded future runs unlocked.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// Admission for one call. Dropped without [`Permit::complete`] (the caller's
/// future was cancelled) it hands a half-open trial slot back.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    started: Instant,
    completed: bool,
}

impl Permit<'_> {
    fn complete(mut self, failed: bool) {
        self.completed = true;
        self.breaker
            .record(self.generation, failed, self.started.elapsed());
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.release(self.generation);
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        metrics::gauge!("circuit_breaker_state", "breaker" => name.clone())
            .set(CircuitState::Closed.gauge_value());
        Self {
            name,
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                window: VecDeque::new(),
                opened_at: None,
                trials_started: 0,
                trials: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state. An open breaker whose wait has elapsed still reports `Open`
    /// until the next call moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn metrics(&self) -> BreakerMetrics {
        let mut inner = self.lock();
        let now = Instant::now();
        self.evict_expired(&mut inner, now);
        let rates = match inner.state {
            CircuitState::HalfOpen => Rates::of(inner.trials.iter()),
            _ => Rates::of(inner.window.iter()),
        };
        BreakerMetrics {
            state: inner.state,
            buffered_calls: rates.total,
            failed_calls: rates.failed,
            slow_calls: rates.slow,
            failure_rate: rates.failure_rate(),
            slow_call_rate: rates.slow_call_rate(),
        }
    }

    /// Run `operation` if the breaker admits it and record its outcome.
    ///
    /// An `Err` from the operation counts as a failure; any completion slower than
    /// the configured slow-call duration counts as slow.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_classified(operation, |_| true).await
    }

    /// Like [`call`](Self::call), but only errors for which `is_failure` returns
    /// `true` count against the breaker. The rest are recorded as successes and
    /// still returned to the caller.
    pub async fn call_classified<F, Fut, T, E, C>(
        &self,
        operation: F,
        is_failure: C,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> bool,
    {
        let permit = self.acquire_permission::<E>()?;

        let result = operation().await;

        permit.complete(result.as_ref().err().is_some_and(is_failure));
        result.map_err(CallError::Inner)
    }

    /// Force the breaker back to closed with an empty window.
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed, Instant::now());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire_permission<E>(&self) -> Result<Permit<'_>, CallError<E>> {
        let mut inner = self.lock();
        let now = Instant::now();

        if inner.state == CircuitState::Open {
            let waited = inner
                .opened_at
                .map(|at| now.duration_since(at) >= self.config.wait_in_open)
                .unwrap_or(true);
            if !waited {
                metrics::counter!("circuit_breaker_calls_total", "breaker" => self.name.clone(), "outcome" => "rejected")
                    .increment(1);
                debug!(breaker = %self.name, "Call rejected, circuit open");
                return Err(CallError::Rejected {
                    name: self.name.clone(),
                });
            }
            self.transition(&mut inner, CircuitState::HalfOpen, now);
        }

        if inner.state == CircuitState::HalfOpen {
            if inner.trials_started >= self.config.permitted_calls_in_half_open {
                metrics::counter!("circuit_breaker_calls_total", "breaker" => self.name.clone(), "outcome" => "rejected")
                    .increment(1);
                return Err(CallError::Rejected {
                    name: self.name.clone(),
                });
            }
            inner.trials_started += 1;
        }

        Ok(Permit {
            breaker: self,
            generation: inner.generation,
            started: now,
            completed: false,
        })
    }

    /// Give back a half-open trial slot whose call never finished.
    fn release(&self, generation: u64) {
        metrics::counter!("circuit_breaker_calls_total", "breaker" => self.name.clone(), "outcome" => "cancelled")
            .increment(1);
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.trials_started = inner.trials_started.saturating_sub(1);
            debug!(breaker = %self.name, "Trial call cancelled, slot released");
        }
    }

    fn record(&self, generation: u64, failed: bool, elapsed: Duration) {
        let slow = elapsed >= self.config.slow_call_duration;
        let outcome_label = if failed { "failure" } else { "success" };
        metrics::counter!("circuit_breaker_calls_total", "breaker" => self.name.clone(), "outcome" => outcome_label)
            .increment(1);
        if slow {
            metrics::counter!("circuit_breaker_slow_calls_total", "breaker" => self.name.clone())
                .increment(1);
        }

        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }

        let now = Instant::now();
        let outcome = Outcome {
            failed,
            slow,
            at: now,
        };

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(outcome);
                self.evict_expired(&mut inner, now);
                let rates = Rates::of(inner.window.iter());
                if rates.total >= self.config.effective_minimum_calls() && self.exceeded(&rates) {
                    warn!(
                        breaker = %self.name,
                        failure_rate = rates.failure_rate(),
                        slow_call_rate = rates.slow_call_rate(),
                        buffered_calls = rates.total,
                        "Circuit breaker OPENED"
                    );
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                inner.trials.push(outcome);
                if inner.trials.len() >= self.config.permitted_calls_in_half_open {
                    let rates = Rates::of(inner.trials.iter());
                    if self.exceeded(&rates) {
                        warn!(
                            breaker = %self.name,
                            failure_rate = rates.failure_rate(),
                            slow_call_rate = rates.slow_call_rate(),
                            "Circuit breaker re-OPENED after trial calls"
                        );
                        self.transition(&mut inner, CircuitState::Open, now);
                    } else {
                        self.transition(&mut inner, CircuitState::Closed, now);
                    }
                }
            }
            CircuitState::Open => {}
        }
    }

    fn exceeded(&self, rates: &Rates) -> bool {
        rates.failure_rate() >= self.config.failure_rate_threshold
            || rates.slow_call_rate() >= self.config.slow_call_rate_threshold
    }

    fn evict_expired(&self, inner: &mut Inner, now: Instant) {
        match self.config.sliding_window {
            SlidingWindow::Count(size) => {
                while inner.window.len() > size {
                    inner.window.pop_front();
                }
            }
            SlidingWindow::Time(span) => {
                while inner
                    .window
                    .front()
                    .is_some_and(|o| now.duration_since(o.at) > span)
                {
                    inner.window.pop_front();
                }
            }
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.window.clear();
        inner.trials.clear();
        inner.trials_started = 0;
        inner.opened_at = (to == CircuitState::Open).then_some(now);

        match to {
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, "Circuit breaker HALF-OPEN (testing recovery)")
            }
            CircuitState::Closed if from != CircuitState::Closed => {
                info!(breaker = %self.name, "Circuit breaker CLOSED (recovered)")
            }
            _ => {}
        }

        metrics::counter!(
            "circuit_breaker_transitions_total",
            "breaker" => self.name.clone(),
            "state" => to.as_str()
        )
        .increment(1);
        metrics::gauge!("circuit_breaker_state", "breaker" => self.name.clone())
            .set(to.gauge_value());
    }
}
