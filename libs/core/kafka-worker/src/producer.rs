use crate::config::KafkaConfig;
use crate::error::KafkaWorkerError;
use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tracing::{debug, info};

/// A record ready to be written to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub partition: Option<i32>,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl OutboundRecord {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            key: None,
            payload,
            headers: Vec::new(),
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Anything that can durably hand a record to the broker.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Write one record; resolves once the broker acknowledged it or the attempt failed.
    async fn send(&self, record: &OutboundRecord) -> Result<(), KafkaWorkerError>;
}

/// [`RecordSink`] backed by an rdkafka `FutureProducer`.
pub struct KafkaProducer {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl KafkaProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaWorkerError> {
        let producer: FutureProducer = config.producer_config().create()?;
        info!(
            bootstrap_servers = %config.bootstrap_servers,
            "Kafka producer created"
        );
        Ok(Self {
            producer,
            queue_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }
}

#[async_trait]
impl RecordSink for KafkaProducer {
    async fn send(&self, record: &OutboundRecord) -> Result<(), KafkaWorkerError> {
        let headers = record
            .headers
            .iter()
            .fold(OwnedHeaders::new(), |headers, (key, value)| {
                headers.insert(Header {
                    key: key.as_str(),
                    value: Some(value.as_bytes()),
                })
            });

        let mut future_record: FutureRecord<'_, str, [u8]> =
            FutureRecord::to(&record.topic)
                .payload(record.payload.as_slice())
                .headers(headers);
        if let Some(partition) = record.partition {
            future_record = future_record.partition(partition);
        }
        if let Some(key) = record.key.as_deref() {
            future_record = future_record.key(key);
        }

        match self.producer.send(future_record, self.queue_timeout).await {
            Ok(_) => {
                debug!(
                    topic = %record.topic,
                    partition = ?record.partition,
                    bytes = record.payload.len(),
                    "Record delivered"
                );
                Ok(())
            }
            Err((err, _)) => Err(KafkaWorkerError::Delivery {
                topic: record.topic.clone(),
                reason: err.to_string(),
            }),
        }
    }
}
