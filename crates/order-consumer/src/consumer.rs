use common::OrderUid;
use order_store::{OrderRecord, OrderStore, validate_record};
use rdkafka::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::types::RDKafkaErrorCode;
use tokio::sync::watch;

use crate::ConsumerError;

/// Connection settings for the ingestion consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
}

/// Long-running Kafka consumer that writes each decoded order through
/// the durable store and only then commits the offset.
pub struct OrderConsumer<S: OrderStore> {
    consumer: StreamConsumer,
    store: S,
    topic: String,
}

impl<S: OrderStore> OrderConsumer<S> {
    /// Creates the consumer and subscribes to the topic.
    ///
    /// Auto-commit is disabled; offsets advance only through the
    /// explicit commit that follows a successful write.
    pub fn new(config: &ConsumerConfig, store: S) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[&config.topic])?;

        Ok(Self {
            consumer,
            store,
            topic: config.topic.clone(),
        })
    }

    /// Runs the consumer loop until shutdown is signalled or a fatal
    /// feed error occurs.
    ///
    /// Shutdown is observed at the receive point only: a message that
    /// has already been pulled from the feed completes its
    /// write-then-commit step before the loop stops. Non-fatal feed
    /// errors are logged and polling continues.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ConsumerError> {
        tracing::info!(topic = %self.topic, "consumer loop started");

        let result = loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested: stopping consumer");
                    break Ok(());
                }
                received = self.consumer.recv() => {
                    match received {
                        Ok(message) => self.handle_message(&message).await,
                        Err(err @ KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal)) => {
                            tracing::error!(error = %err, "fatal feed error: terminating consumer");
                            break Err(ConsumerError::Kafka(err));
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "feed error, continuing to poll");
                        }
                    }
                }
            }
        };

        self.consumer.unsubscribe();
        tracing::info!("consumer stopped");
        result
    }

    /// Decodes and persists one message, committing its offset only on
    /// success. Any failure skips the message: it stays uncommitted and
    /// may be redelivered, which the replace upsert tolerates.
    async fn handle_message(&self, message: &BorrowedMessage<'_>) {
        let Some(payload) = message.payload() else {
            tracing::warn!(offset = message.offset(), "message has no payload, skipped");
            return;
        };

        match ingest_payload(&self.store, payload).await {
            Ok(order_uid) => {
                metrics::counter!("orders_ingested_total").increment(1);
                tracing::info!(%order_uid, offset = message.offset(), "order ingested");

                if let Err(err) = self.consumer.commit_message(message, CommitMode::Async) {
                    // The store write stands; the message may simply be
                    // redelivered and reprocessed.
                    tracing::warn!(error = %err, offset = message.offset(), "offset commit failed");
                }
            }
            Err(err @ (ConsumerError::Decode(_) | ConsumerError::Validation(_))) => {
                metrics::counter!("orders_skipped_total", "reason" => "decode").increment(1);
                tracing::warn!(error = %err, offset = message.offset(), "undecodable message skipped");
            }
            Err(err) => {
                metrics::counter!("orders_skipped_total", "reason" => "store").increment(1);
                tracing::warn!(error = %err, offset = message.offset(), "order write failed, message skipped");
            }
        }
    }
}

/// Decodes a feed payload into an order aggregate and checks its
/// invariants.
pub fn decode_order(payload: &[u8]) -> Result<OrderRecord, ConsumerError> {
    let record: OrderRecord = serde_json::from_slice(payload)?;
    validate_record(&record).map_err(ConsumerError::Validation)?;
    Ok(record)
}

/// Decodes a payload and writes the aggregate through the store.
///
/// This is the per-message unit of work the consumer loop commits on;
/// it is separate from the loop so ingestion semantics are testable
/// without a broker.
pub async fn ingest_payload<S: OrderStore>(
    store: &S,
    payload: &[u8],
) -> Result<OrderUid, ConsumerError> {
    let record = decode_order(payload)?;
    store.put_order(&record).await?;
    Ok(record.order_uid().clone())
}

#[cfg(test)]
mod tests {
    use order_store::{InMemoryOrderStore, StoreError};

    use super::*;

    fn feed_payload(uid: &str) -> Vec<u8> {
        format!(
            r#"{{
            "orders": {{
                "order_uid": "{uid}",
                "track_number": "WBILMTESTTRACK",
                "entry": "WBIL",
                "locale": "en",
                "internal_signature": null,
                "customer_id": "test",
                "delivery_service": "meest",
                "shardkey": "9",
                "sm_id": 99,
                "date_created": "2021-11-26T06:22:19Z",
                "oof_shard": "1"
            }},
            "delivery": {{
                "order_uid": "{uid}",
                "name": "Test Testov",
                "phone": "+9720000000",
                "zip": "2639809",
                "city": "Kiryat Mozkin",
                "address": "Ploshad Mira 15",
                "region": "Kraiot",
                "email": "test@gmail.com"
            }},
            "payment": {{
                "order_uid": "{uid}",
                "transaction": "{uid}",
                "request_id": null,
                "currency": "USD",
                "provider": "wbpay",
                "amount": 1817,
                "payment_dt": 1637907727,
                "bank": "alpha",
                "delivery_cost": 1500,
                "goods_total": 317,
                "custom_fee": 0
            }},
            "items": [
                {{
                    "order_uid": "{uid}",
                    "chrt_id": 9934930,
                    "track_number": "WBILMTESTTRACK",
                    "price": 453,
                    "rid": "ab4219087a764ae0btest",
                    "name": "Mascaras",
                    "sale": 30,
                    "size": "0",
                    "total_price": 317,
                    "nm_id": 2389212,
                    "brand": "Vivienne Sabo",
                    "status": 202
                }}
            ]
        }}"#
        )
        .into_bytes()
    }

    #[test]
    fn decode_valid_payload() {
        let record = decode_order(&feed_payload("order-42")).unwrap();
        assert_eq!(record.order_uid().as_str(), "order-42");
        assert_eq!(record.items.len(), 1);
    }

    #[test]
    fn decode_malformed_payload_fails() {
        let err = decode_order(b"{not json").unwrap_err();
        assert!(matches!(err, ConsumerError::Decode(_)));
    }

    #[test]
    fn decode_rejects_mismatched_item_uid() {
        let mut doc: serde_json::Value =
            serde_json::from_slice(&feed_payload("order-42")).unwrap();
        doc["items"][0]["order_uid"] = "other-order".into();

        let payload = serde_json::to_vec(&doc).unwrap();
        let err = decode_order(&payload).unwrap_err();
        assert!(matches!(err, ConsumerError::Validation(_)));
    }

    #[tokio::test]
    async fn ingest_persists_the_order() {
        let store = InMemoryOrderStore::new();

        let uid = ingest_payload(&store, &feed_payload("order-42")).await.unwrap();

        assert_eq!(uid.as_str(), "order-42");
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn ingest_is_idempotent_under_redelivery() {
        let store = InMemoryOrderStore::new();
        let payload = feed_payload("order-42");

        ingest_payload(&store, &payload).await.unwrap();
        let first = store.get_order(&OrderUid::new("order-42")).await.unwrap();

        // Redelivery after a crash-between-write-and-commit.
        ingest_payload(&store, &payload).await.unwrap();
        let second = store.get_order(&OrderUid::new("order-42")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn failed_write_surfaces_err_and_persists_nothing() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_put(true).await;

        // The Err return is what keeps the loop from committing the
        // offset, so the message stays eligible for redelivery.
        let err = ingest_payload(&store, &feed_payload("order-42")).await.unwrap_err();
        assert!(matches!(err, ConsumerError::Store(StoreError::Timeout)));
        assert_eq!(store.order_count().await, 0);

        store.set_fail_on_put(false).await;
        ingest_payload(&store, &feed_payload("order-42")).await.unwrap();
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_payload_does_not_touch_the_store() {
        let store = InMemoryOrderStore::new();

        let err = ingest_payload(&store, b"\xff\xfe").await.unwrap_err();
        assert!(matches!(err, ConsumerError::Decode(_)));
        assert_eq!(store.order_count().await, 0);
    }
}
