//! Read-through query service over the cache and the durable store.

use common::OrderUid;
use order_cache::OrderCache;
use order_store::{OrderRecord, OrderStore, StoreError};

/// Serves order lookups: cache first, store on miss, write-back on hit
/// from the store.
///
/// A store failure on the miss path (including a timeout) is reported
/// as "not found" to the caller; not-found results are never cached,
/// so repeated lookups of a nonexistent identifier always reach the
/// store.
pub struct QueryService<S: OrderStore> {
    store: S,
    cache: OrderCache,
}

impl<S: OrderStore> QueryService<S> {
    /// Creates a query service over the given store and cache.
    pub fn new(store: S, cache: OrderCache) -> Self {
        Self { store, cache }
    }

    /// Looks up the full aggregate for an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_uid: &OrderUid) -> Option<OrderRecord> {
        if let Some(record) = self.cache.get(order_uid) {
            metrics::counter!("cache_hits_total").increment(1);
            return Some(record);
        }
        metrics::counter!("cache_misses_total").increment(1);

        match self.store.get_order(order_uid).await {
            Ok(record) => {
                self.cache.set(order_uid.clone(), record.clone());
                Some(record)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(%order_uid, "order not found");
                None
            }
            Err(err) => {
                tracing::warn!(%order_uid, error = %err, "store read failed, reporting not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use order_store::{Delivery, InMemoryOrderStore, Item, OrderHeader, Payment};

    use super::*;

    fn sample_record(uid: &str) -> OrderRecord {
        let order_uid = OrderUid::new(uid);
        OrderRecord {
            order: OrderHeader {
                order_uid: order_uid.clone(),
                track_number: "WBILMTESTTRACK".to_string(),
                entry: "WBIL".to_string(),
                locale: "en".to_string(),
                internal_signature: None,
                customer_id: "test".to_string(),
                delivery_service: "meest".to_string(),
                shardkey: "9".to_string(),
                sm_id: 99,
                date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
                oof_shard: "1".to_string(),
            },
            delivery: Delivery {
                order_uid: order_uid.clone(),
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: "test@gmail.com".to_string(),
            },
            payment: Payment {
                order_uid: order_uid.clone(),
                transaction: uid.to_string(),
                request_id: None,
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1817,
                payment_dt: 1637907727,
                bank: "alpha".to_string(),
                delivery_cost: 1500,
                goods_total: 317,
                custom_fee: 0,
            },
            items: vec![Item {
                order_uid,
                chrt_id: 9934930,
                track_number: "WBILMTESTTRACK".to_string(),
                price: 453,
                rid: "ab4219087a764ae0btest".to_string(),
                name: "Mascaras".to_string(),
                sale: 30,
                size: "0".to_string(),
                total_price: 317,
                nm_id: 2389212,
                brand: "Vivienne Sabo".to_string(),
                status: 202,
            }],
        }
    }

    fn service() -> (QueryService<InMemoryOrderStore>, InMemoryOrderStore, OrderCache) {
        let store = InMemoryOrderStore::new();
        let cache = OrderCache::new(Duration::from_secs(600));
        let service = QueryService::new(store.clone(), cache.clone());
        (service, store, cache)
    }

    #[tokio::test]
    async fn miss_reads_store_and_writes_back() {
        let (service, store, cache) = service();
        store.put_order(&sample_record("order-1")).await.unwrap();

        let record = service.get_order(&OrderUid::new("order-1")).await.unwrap();
        assert_eq!(record.order_uid().as_str(), "order-1");

        assert_eq!(store.read_count().await, 1);
        assert!(cache.get(&OrderUid::new("order-1")).is_some());
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let (service, store, _cache) = service();
        store.put_order(&sample_record("order-1")).await.unwrap();

        service.get_order(&OrderUid::new("order-1")).await.unwrap();
        service.get_order(&OrderUid::new("order-1")).await.unwrap();

        assert_eq!(store.read_count().await, 1);
    }

    #[tokio::test]
    async fn not_found_is_never_cached() {
        let (service, store, cache) = service();

        assert!(service.get_order(&OrderUid::new("missing")).await.is_none());
        assert!(service.get_order(&OrderUid::new("missing")).await.is_none());

        // Every lookup of a nonexistent order reaches the store.
        assert_eq!(store.read_count().await, 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn store_failure_maps_to_not_found() {
        let (service, store, cache) = service();
        store.put_order(&sample_record("order-1")).await.unwrap();
        store.set_fail_on_get(true).await;

        assert!(service.get_order(&OrderUid::new("order-1")).await.is_none());
        assert!(cache.is_empty());
    }
}
