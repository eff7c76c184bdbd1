//! Sequential consume loop.
//!
//! Each message is handed to a [`MessageHandler`] and its offset is stored once the
//! handler returns, whatever the outcome. Offsets are committed in the background,
//! which gives at-least-once delivery: a crash between handling and commit replays
//! the message. A failing or panicking handler never stops the loop.

use crate::config::KafkaConfig;
use crate::error::{HandlerError, KafkaWorkerError};
use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use rdkafka::Message;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Headers;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const MAX_BACKOFF_SECS: u64 = 30;

/// Owned copy of a consumed record, detached from the client's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl InboundMessage {
    pub fn from_message<M: Message>(message: &M) -> Self {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|h| (h.key.to_string(), h.value.map(<[u8]>::to_vec)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
            headers,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// First header with the given key, if it carries a value.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// Processes one consumed message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handler name used in logs and metric labels.
    fn name(&self) -> &'static str;

    async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Processed,
    /// Malformed input, logged and skipped.
    Dropped,
    Failed,
    Panicked,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageOutcome::Processed => "processed",
            MessageOutcome::Dropped => "dropped",
            MessageOutcome::Failed => "failed",
            MessageOutcome::Panicked => "panicked",
        }
    }
}

/// Run `handler` on `message`, containing any error or panic.
pub async fn dispatch<H>(handler: &H, message: &InboundMessage) -> MessageOutcome
where
    H: MessageHandler + ?Sized,
{
    let result = AssertUnwindSafe(handler.handle(message))
        .catch_unwind()
        .await;

    let outcome = match result {
        Ok(Ok(())) => {
            debug!(
                handler = handler.name(),
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "Message processed"
            );
            MessageOutcome::Processed
        }
        Ok(Err(HandlerError::Malformed(reason))) => {
            warn!(
                handler = handler.name(),
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                reason = %reason,
                "Dropping malformed message"
            );
            MessageOutcome::Dropped
        }
        Ok(Err(HandlerError::Processing(reason))) => {
            error!(
                handler = handler.name(),
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                reason = %reason,
                "Message processing failed"
            );
            MessageOutcome::Failed
        }
        Err(_) => {
            error!(
                handler = handler.name(),
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "Message handler panicked"
            );
            MessageOutcome::Panicked
        }
    };

    counter!(
        "kafka_messages_consumed_total",
        "topic" => message.topic.clone(),
        "handler" => handler.name(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    outcome
}

/// Consumer-group member that feeds every message of one topic to a handler.
pub struct KafkaConsumerWorker<H> {
    consumer: StreamConsumer,
    topic: String,
    group_id: String,
    handler: Arc<H>,
}

impl<H> KafkaConsumerWorker<H>
where
    H: MessageHandler + 'static,
{
    pub fn new(config: &KafkaConfig, handler: Arc<H>) -> Result<Self, KafkaWorkerError> {
        let consumer: StreamConsumer = config.consumer_config().create()?;
        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
            handler,
        })
    }

    /// Consume until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), KafkaWorkerError> {
        self.consumer.subscribe(&[self.topic.as_str()])?;

        info!(
            topic = %self.topic,
            group = %self.group_id,
            handler = self.handler.name(),
            "Starting Kafka consumer"
        );

        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping consumer");
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Received shutdown signal, stopping consumer");
                        break;
                    }
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        if consecutive_errors > 0 {
                            info!(consecutive_errors, "Consumer recovered");
                            consecutive_errors = 0;
                        }

                        let inbound = InboundMessage::from_message(&message);
                        dispatch(self.handler.as_ref(), &inbound).await;

                        if let Err(e) = self.consumer.store_offset_from_message(&message) {
                            warn!(
                                error = %e,
                                partition = inbound.partition,
                                offset = inbound.offset,
                                "Failed to store consumer offset"
                            );
                        }
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        let backoff_secs =
                            std::cmp::min(2u64.pow(consecutive_errors.min(5)), MAX_BACKOFF_SECS);
                        warn!(
                            error = %e,
                            consecutive_errors,
                            backoff_secs,
                            "Kafka receive error, backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    }
                }
            }
        }

        info!(topic = %self.topic, "Kafka consumer stopped");
        Ok(())
    }
}
