use core_config::ConfigError;
use rdkafka::error::KafkaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KafkaWorkerError {
    #[error("Kafka client error: {0}")]
    Client(#[from] KafkaError),

    #[error("Failed to create topic '{topic}': {reason}")]
    TopicCreation { topic: String, reason: String },

    #[error("Delivery to topic '{topic}' failed: {reason}")]
    Delivery { topic: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KafkaWorkerError {
    /// Broker-side failures that a later attempt may get past.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KafkaWorkerError::Delivery { .. } | KafkaWorkerError::Client(_)
        )
    }
}

/// Failure reported by a [`crate::MessageHandler`] for a single message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The message can never be processed (bad payload); it is logged and dropped.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Processing failed for this delivery.
    #[error("Processing failed: {0}")]
    Processing(String),
}
