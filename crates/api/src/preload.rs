//! Startup cache preloading.

use order_cache::OrderCache;
use order_store::{OrderStore, StoreError};

/// Seeds the cache with the `limit` most recently created orders.
///
/// Runs once before the service accepts feed messages or client
/// queries. A read failure for an individual order is logged and
/// skipped; only a failure to list the recent identifiers aborts the
/// preload. Returns the number of orders seeded.
#[tracing::instrument(skip(store, cache))]
pub async fn preload_cache<S: OrderStore>(
    store: &S,
    cache: &OrderCache,
    limit: i64,
) -> Result<usize, StoreError> {
    let uids = store.recent_order_uids(limit).await?;

    let mut seeded = 0;
    for uid in uids {
        match store.get_order(&uid).await {
            Ok(record) => {
                cache.set(uid.clone(), record);
                seeded += 1;
                tracing::debug!(order_uid = %uid, "order preloaded");
            }
            Err(err) => {
                tracing::warn!(order_uid = %uid, error = %err, "preload read failed, skipping");
            }
        }
    }

    tracing::info!(seeded, "cache preload complete");
    Ok(seeded)
}
