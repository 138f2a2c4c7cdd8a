//! Time-bounded in-memory cache of order aggregates.
//!
//! A single shared map protected by a whole-map read-write lock: many
//! concurrent readers, one writer at a time, no per-key locking.
//! Expiration is lazy only, an entry past its deadline is purged on the
//! next `get` of that key, and an entry that is never re-read stays in
//! memory indefinitely. There is no size bound and no background sweep;
//! this trades memory-boundedness for simplicity.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use common::OrderUid;
use order_store::OrderRecord;
use tokio::time::Instant;

struct CacheEntry {
    record: OrderRecord,
    expires_at: Instant,
}

/// Concurrent order-uid → aggregate cache with per-entry absolute
/// expiration.
///
/// Cloning is cheap and shares the underlying map.
#[derive(Clone)]
pub struct OrderCache {
    entries: Arc<RwLock<HashMap<OrderUid, CacheEntry>>>,
    ttl: Duration,
}

impl OrderCache {
    /// Creates an empty cache whose entries expire `ttl` after each set.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the cached aggregate, or `None` when the key is absent
    /// or its entry has expired. An expired entry is removed as a side
    /// effect.
    pub fn get(&self, order_uid: &OrderUid) -> Option<OrderRecord> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(order_uid) {
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Some(entry.record.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: purge lazily. Re-check under the write lock so a
        // concurrent refresh is not discarded.
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get(order_uid) {
            if Instant::now() < entry.expires_at {
                return Some(entry.record.clone());
            }
            entries.remove(order_uid);
            tracing::debug!(%order_uid, "expired cache entry purged");
        }
        None
    }

    /// Stores the aggregate, overwriting any previous entry and
    /// resetting its expiration to now + TTL.
    pub fn set(&self, order_uid: OrderUid, record: OrderRecord) {
        let entry = CacheEntry {
            record,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().unwrap().insert(order_uid, entry);
    }

    /// Number of entries currently held, including not-yet-purged
    /// expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}
