//! Kafka ingestion for the order service.
//!
//! Consumes order events from a topic under a consumer group with
//! manual offset commits: an offset is committed only after the order
//! has been durably written, so a crash between write and commit at
//! worst replays a message into an idempotent replace upsert
//! (at-least-once delivery).

pub mod consumer;
pub mod error;
pub mod topic;

pub use consumer::{ConsumerConfig, OrderConsumer, decode_order, ingest_payload};
pub use error::ConsumerError;
pub use topic::ensure_topic;
