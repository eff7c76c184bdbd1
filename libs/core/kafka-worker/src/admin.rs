use crate::config::KafkaConfig;
use crate::error::KafkaWorkerError;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Created,
    AlreadyExists,
}

/// Create the configured topic if it does not exist yet.
pub async fn ensure_topic(config: &KafkaConfig) -> Result<TopicStatus, KafkaWorkerError> {
    let admin: AdminClient<DefaultClientContext> = config.admin_config().create()?;
    let topic = NewTopic::new(
        &config.topic,
        config.topic_partitions,
        TopicReplication::Fixed(config.topic_replicas),
    );
    let options = AdminOptions::new().operation_timeout(Some(Duration::from_secs(10)));

    let results = admin.create_topics([&topic], &options).await?;
    let mut status = TopicStatus::AlreadyExists;
    for result in results {
        status = classify(result)?;
    }

    match status {
        TopicStatus::Created => info!(
            topic = %config.topic,
            partitions = config.topic_partitions,
            replicas = config.topic_replicas,
            "Topic created"
        ),
        TopicStatus::AlreadyExists => debug!(topic = %config.topic, "Topic already exists"),
    }
    Ok(status)
}

fn classify(result: TopicResult) -> Result<TopicStatus, KafkaWorkerError> {
    match result {
        Ok(_) => Ok(TopicStatus::Created),
        Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => Ok(TopicStatus::AlreadyExists),
        Err((topic, code)) => Err(KafkaWorkerError::TopicCreation {
            topic,
            reason: code.to_string(),
        }),
    }
}
