use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use thiserror::Error;

/// Errors that can occur in the ingestion path.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// A Kafka client or feed-level error occurred.
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// The broker rejected topic creation.
    #[error("Topic creation failed for {topic}: {code}")]
    TopicCreation {
        topic: String,
        code: RDKafkaErrorCode,
    },

    /// The message payload was not a valid order document.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The decoded record violates an aggregate invariant.
    #[error("Invalid order payload: {0}")]
    Validation(String),

    /// The durable write failed.
    #[error("Store error: {0}")]
    Store(#[from] order_store::StoreError),
}
