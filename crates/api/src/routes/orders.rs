//! Order lookup endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::SecondsFormat;
use common::OrderUid;
use order_store::{OrderRecord, OrderStore};
use serde::Serialize;

use crate::error::ApiError;
use crate::query::QueryService;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub query: QueryService<S>,
}

// -- Response types --
//
// The response flattens the header to the top level with delivery,
// payment, and items nested, matching the feed payload's field names.
// Optional strings are rendered as empty strings.

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    pub date_created: String,
    pub oof_shard: String,
    pub delivery: DeliveryResponse,
    pub payment: PaymentResponse,
    pub items: Vec<ItemResponse>,
}

#[derive(Serialize)]
pub struct DeliveryResponse {
    pub order_uid: String,
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub order_uid: String,
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i32,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i32,
    pub goods_total: i32,
    pub custom_fee: i32,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub order_uid: String,
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

impl From<&OrderRecord> for OrderResponse {
    fn from(record: &OrderRecord) -> Self {
        let order = &record.order;
        Self {
            order_uid: order.order_uid.to_string(),
            track_number: order.track_number.clone(),
            entry: order.entry.clone(),
            locale: order.locale.clone(),
            internal_signature: order.internal_signature.clone().unwrap_or_default(),
            customer_id: order.customer_id.clone(),
            delivery_service: order.delivery_service.clone(),
            shardkey: order.shardkey.clone(),
            sm_id: order.sm_id,
            date_created: order.date_created.to_rfc3339_opts(SecondsFormat::Secs, true),
            oof_shard: order.oof_shard.clone(),
            delivery: DeliveryResponse {
                order_uid: record.delivery.order_uid.to_string(),
                name: record.delivery.name.clone(),
                phone: record.delivery.phone.clone(),
                zip: record.delivery.zip.clone(),
                city: record.delivery.city.clone(),
                address: record.delivery.address.clone(),
                region: record.delivery.region.clone(),
                email: record.delivery.email.clone(),
            },
            payment: PaymentResponse {
                order_uid: record.payment.order_uid.to_string(),
                transaction: record.payment.transaction.clone(),
                request_id: record.payment.request_id.clone().unwrap_or_default(),
                currency: record.payment.currency.clone(),
                provider: record.payment.provider.clone(),
                amount: record.payment.amount,
                payment_dt: record.payment.payment_dt,
                bank: record.payment.bank.clone(),
                delivery_cost: record.payment.delivery_cost,
                goods_total: record.payment.goods_total,
                custom_fee: record.payment.custom_fee,
            },
            items: record
                .items
                .iter()
                .map(|item| ItemResponse {
                    order_uid: item.order_uid.to_string(),
                    chrt_id: item.chrt_id,
                    track_number: item.track_number.clone(),
                    price: item.price,
                    rid: item.rid.clone(),
                    name: item.name.clone(),
                    sale: item.sale,
                    size: item.size.clone(),
                    total_price: item.total_price,
                    nm_id: item.nm_id,
                    brand: item.brand.clone(),
                    status: item.status,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// GET /order/:order_uid — look up an order by identifier.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_uid): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let uid = OrderUid::new(order_uid);

    match state.query.get_order(&uid).await {
        Some(record) => Ok(Json(OrderResponse::from(&record))),
        None => Err(ApiError::NotFound("Order not found".to_string())),
    }
}
