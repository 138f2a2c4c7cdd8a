use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;

use crate::ConsumerError;

/// Creates the topic if it does not exist yet.
///
/// Idempotent: a `TopicAlreadyExists` outcome from the broker counts
/// as success.
pub async fn ensure_topic(
    brokers: &str,
    topic: &str,
    num_partitions: i32,
    replication_factor: i32,
) -> Result<(), ConsumerError> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .create()?;

    let new_topic = NewTopic::new(topic, num_partitions, TopicReplication::Fixed(replication_factor));
    let options = AdminOptions::new().operation_timeout(Some(Duration::from_secs(30)));

    let results = admin.create_topics([&new_topic], &options).await?;
    for result in results {
        match result {
            Ok(name) => tracing::info!(topic = %name, "topic created"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                tracing::info!(topic = %name, "topic already exists");
            }
            Err((name, code)) => {
                return Err(ConsumerError::TopicCreation { topic: name, code });
            }
        }
    }

    Ok(())
}
