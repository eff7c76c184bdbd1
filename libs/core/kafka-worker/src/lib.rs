//! Kafka plumbing shared by the producing and consuming services.
//!
//! - [`KafkaConfig`]: broker, topic and consumer-group settings from the environment
//! - [`ensure_topic`]: idempotent topic provisioning through the admin API
//! - [`KafkaProducer`]: [`RecordSink`] backed by an rdkafka `FutureProducer`
//! - [`KafkaConsumerWorker`]: sequential consume loop that isolates handler failures
//! - [`metrics`]: Prometheus recorder and `/metrics` route

pub mod admin;
pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod producer;

pub use admin::{TopicStatus, ensure_topic};
pub use config::KafkaConfig;
pub use consumer::{InboundMessage, KafkaConsumerWorker, MessageHandler, MessageOutcome, dispatch};
pub use error::{HandlerError, KafkaWorkerError};
pub use producer::{KafkaProducer, OutboundRecord, RecordSink};
