use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    OrderRecord, OrderUid, Result, StoreError,
    store::{OrderStore, validate_record},
};

#[derive(Default)]
struct Inner {
    orders: HashMap<OrderUid, OrderRecord>,
    reads: u64,
    fail_on_put: bool,
    fail_on_get: bool,
}

/// In-memory order store implementation for testing.
///
/// Provides the same interface and validation as the PostgreSQL
/// implementation, plus instrumentation used by cache and consumer
/// tests: a read counter and a switch that simulates a mid-write
/// store failure.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns how many times `get_order` has been called.
    pub async fn read_count(&self) -> u64 {
        self.inner.read().await.reads
    }

    /// Configures the store to fail every subsequent `put_order` call.
    pub async fn set_fail_on_put(&self, fail: bool) {
        self.inner.write().await.fail_on_put = fail;
    }

    /// Configures the store to fail every subsequent `get_order` call,
    /// simulating a read-path outage.
    pub async fn set_fail_on_get(&self, fail: bool) {
        self.inner.write().await.fail_on_get = fail;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_order(&self, order_uid: &OrderUid) -> Result<OrderRecord> {
        let mut inner = self.inner.write().await;
        inner.reads += 1;
        if inner.fail_on_get {
            return Err(StoreError::Timeout);
        }
        inner
            .orders
            .get(order_uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(order_uid.clone()))
    }

    async fn put_order(&self, record: &OrderRecord) -> Result<()> {
        validate_record(record).map_err(StoreError::InvalidRecord)?;

        let mut inner = self.inner.write().await;
        if inner.fail_on_put {
            return Err(StoreError::Timeout);
        }
        inner
            .orders
            .insert(record.order_uid().clone(), record.clone());
        Ok(())
    }

    async fn recent_order_uids(&self, limit: i64) -> Result<Vec<OrderUid>> {
        let inner = self.inner.read().await;
        let mut records: Vec<&OrderRecord> = inner.orders.values().collect();
        records.sort_by(|a, b| b.order.date_created.cmp(&a.order.date_created));
        Ok(records
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|r| r.order_uid().clone())
            .collect())
    }
}
