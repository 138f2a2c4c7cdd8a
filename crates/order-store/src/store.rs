use async_trait::async_trait;

use crate::{OrderRecord, OrderUid, Result};

/// Core trait for order store implementations.
///
/// A store persists full order aggregates and serves point lookups by
/// order identifier. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Reads the full aggregate for an order.
    ///
    /// Composes the header, delivery, payment, and item lookups. A
    /// missing header, delivery, or payment row yields
    /// [`StoreError::NotFound`](crate::StoreError::NotFound); an
    /// aggregate with zero line items is valid.
    async fn get_order(&self, order_uid: &OrderUid) -> Result<OrderRecord>;

    /// Writes the full aggregate in a single transaction.
    ///
    /// Each part is upserted keyed by `order_uid` (items by
    /// `(order_uid, chrt_id)`); re-delivery of the same order replaces
    /// all fields. Either every part is persisted or none is.
    async fn put_order(&self, record: &OrderRecord) -> Result<()>;

    /// Returns the identifiers of the most recently created orders,
    /// newest first by `date_created`.
    async fn recent_order_uids(&self, limit: i64) -> Result<Vec<OrderUid>>;
}

/// Validates an aggregate before it is written.
///
/// Every part of the record must carry the header's order identifier;
/// an empty identifier is rejected outright.
pub fn validate_record(record: &OrderRecord) -> std::result::Result<(), String> {
    let uid = record.order_uid();
    if uid.is_empty() {
        return Err("order_uid must not be empty".to_string());
    }
    if record.delivery.order_uid != *uid {
        return Err(format!(
            "delivery order_uid {} does not match header {uid}",
            record.delivery.order_uid
        ));
    }
    if record.payment.order_uid != *uid {
        return Err(format!(
            "payment order_uid {} does not match header {uid}",
            record.payment.order_uid
        ));
    }
    for item in &record.items {
        if item.order_uid != *uid {
            return Err(format!(
                "item chrt_id={} order_uid {} does not match header {uid}",
                item.chrt_id, item.order_uid
            ));
        }
    }
    Ok(())
}
