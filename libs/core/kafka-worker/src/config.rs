use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use rdkafka::ClientConfig;

/// Broker, topic and consumer-group settings.
#[derive(Clone, Debug, PartialEq)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    /// Partition every published record is written to.
    pub partition: i32,
    /// Partition count used when the topic is created.
    pub topic_partitions: i32,
    /// Replication factor used when the topic is created.
    pub topic_replicas: i32,
    pub group_id: String,
    /// Upper bound for a single delivery attempt.
    pub message_timeout_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:29092".to_string(),
            topic: "user-event".to_string(),
            partition: 1,
            topic_partitions: 3,
            topic_replicas: 1,
            group_id: "email-service".to_string(),
            message_timeout_ms: 5_000,
        }
    }
}

impl KafkaConfig {
    fn base(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config
    }

    /// Settings for the admin client.
    pub fn admin_config(&self) -> ClientConfig {
        self.base()
    }

    /// Settings for the producer. Retries are driven by the caller, so the
    /// client gives each attempt at most `message_timeout_ms`.
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = self.base();
        config
            .set("message.timeout.ms", self.message_timeout_ms.to_string())
            .set("acks", "all")
            .set("enable.idempotence", "true");
        config
    }

    /// Settings for the consumer. Offsets are stored explicitly after each
    /// message is handled and committed in the background.
    pub fn consumer_config(&self) -> ClientConfig {
        let mut config = self.base();
        config
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false");
        config
    }
}

impl FromEnv for KafkaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bootstrap_servers: env_or_default("KAFKA_BOOTSTRAP_SERVERS", &defaults.bootstrap_servers),
            topic: env_or_default("KAFKA_TOPIC", &defaults.topic),
            partition: env_parse("KAFKA_PARTITION", defaults.partition)?,
            topic_partitions: env_parse("KAFKA_TOPIC_PARTITIONS", defaults.topic_partitions)?,
            topic_replicas: env_parse("KAFKA_TOPIC_REPLICAS", defaults.topic_replicas)?,
            group_id: env_or_default("KAFKA_GROUP_ID", &defaults.group_id),
            message_timeout_ms: env_parse("KAFKA_MESSAGE_TIMEOUT_MS", defaults.message_timeout_ms)?,
        })
    }
}
