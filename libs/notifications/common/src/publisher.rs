use async_trait::async_trait;
use kafka_worker::{KafkaConfig, KafkaWorkerError, OutboundRecord, RecordSink};
use resilience::{CallError, CircuitBreaker, CircuitBreakerConfig, RetryConfig, retry_if};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::event::{EventType, NotificationEvent, encode};

pub const CONTENT_TYPE_HEADER: &str = "content-type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Failure to hand an event to the broker
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker was unreachable or refused the write after the retry budget.
    #[error("Failed to publish {event_type} event: {reason}")]
    Transport {
        event_type: EventType,
        reason: String,
    },

    /// The publish breaker is open; no attempt was made.
    #[error("Event publishing is temporarily suspended: {0}")]
    Rejected(String),
}

/// Outbound side of the user event stream
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError>;
}

/// Publishes events to Kafka with bounded retries behind a circuit breaker.
///
/// Every event goes to the configured topic and partition with a
/// `content-type: application/json` header. A failed publish counts against the
/// breaker once its retries are spent; while the breaker is open, publishes fail
/// immediately with [`PublishError::Rejected`].
pub struct KafkaEventPublisher<S: RecordSink> {
    sink: S,
    topic: String,
    partition: i32,
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl<S: RecordSink> KafkaEventPublisher<S> {
    pub fn new(sink: S, config: &KafkaConfig) -> Self {
        Self {
            sink,
            topic: config.topic.clone(),
            partition: config.partition,
            retry: RetryConfig::kafka_publish(),
            breaker: CircuitBreaker::new("kafka-publisher", CircuitBreakerConfig::kafka_publisher()),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn record_for(&self, event: &NotificationEvent) -> Result<OutboundRecord, PublishError> {
        let payload = encode(event).map_err(|e| PublishError::Transport {
            event_type: event.event_type,
            reason: e.to_string(),
        })?;

        Ok(OutboundRecord::new(&self.topic, payload)
            .with_partition(self.partition)
            .with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE))
    }

    fn map_call_error(event: &NotificationEvent, err: CallError<KafkaWorkerError>) -> PublishError {
        match err {
            CallError::Rejected { name } => PublishError::Rejected(format!(
                "circuit breaker '{}' is open, {} event for {} not sent",
                name, event.event_type, event.email
            )),
            CallError::Inner(e) => PublishError::Transport {
                event_type: event.event_type,
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl<S: RecordSink> EventPublisher for KafkaEventPublisher<S> {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        let record = self.record_for(event)?;

        let result = self
            .breaker
            .call(|| {
                retry_if(
                    || self.sink.send(&record),
                    &self.retry,
                    KafkaWorkerError::is_retryable,
                )
            })
            .await;

        let outcome = if result.is_ok() { "sent" } else { "failed" };
        metrics::counter!(
            "user_events_published_total",
            "event_type" => event.event_type.to_string(),
            "outcome" => outcome
        )
        .increment(1);

        match result {
            Ok(()) => {
                info!(
                    topic = %self.topic,
                    partition = self.partition,
                    event_type = %event.event_type,
                    email = %event.email,
                    "User event published"
                );
                Ok(())
            }
            Err(e) => {
                let err = Self::map_call_error(event, e);
                error!(topic = %self.topic, error = %err, "User event not published");
                Err(err)
            }
        }
    }
}

/// Publisher that keeps events in memory; can be switched to fail on demand.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails with [`PublishError::Transport`].
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<NotificationEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Transport {
                event_type: event.event_type,
                reason: "broker unavailable".to_string(),
            });
        }
        debug!(event_type = %event.event_type, email = %event.email, "Recorded user event");
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
