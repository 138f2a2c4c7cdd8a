//! Order aggregate data model.
//!
//! Field names follow the feed payload: snake_case keys, `date_created`
//! as an RFC 3339 string, monetary amounts as integers in minor units.

use chrono::{DateTime, Utc};
use common::OrderUid;
use serde::{Deserialize, Serialize};

/// Order header row (`orders` table, `orders` object on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub order_uid: OrderUid,
    pub track_number: String,
    pub entry: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_signature: Option<String>,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

/// Recipient and address details, one-to-one with the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub order_uid: OrderUid,
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details, one-to-one with the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub order_uid: OrderUid,
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub currency: String,
    pub provider: String,
    pub amount: i32,
    /// Payment timestamp in epoch seconds.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i32,
    pub goods_total: i32,
    pub custom_fee: i32,
}

/// A single order line, keyed by `(order_uid, chrt_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub order_uid: OrderUid,
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i32,
    pub rid: String,
    pub name: String,
    pub sale: i32,
    pub size: String,
    pub total_price: i32,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

/// The full order aggregate: header, delivery, payment, and line items.
///
/// This is the unit of ingestion, storage, and caching. It is never
/// partially materialized: a read either produces all four parts or
/// fails, and a write persists all four parts or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "orders")]
    pub order: OrderHeader,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
}

impl OrderRecord {
    /// Returns the order identifier shared by all parts of the aggregate.
    pub fn order_uid(&self) -> &OrderUid {
        &self.order.order_uid
    }
}
