//! Cursor-based keyspace enumeration.

use std::collections::HashSet;
use std::future::{ready, Future};
use std::time::{Duration, Instant};

use compare_store::KeyValueStore;
use tracing::info;

use crate::Result;

/// How often scan progress is logged.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Walk every shard of `store` with `SCAN ... COUNT batch_size`, handing
/// each non-empty page to `on_page` and awaiting it before the next SCAN.
///
/// A failing SCAN (or callback) stops the walk and is returned; pages already
/// delivered stay delivered.
pub async fn scan_pages<F, Fut>(
    store: &dyn KeyValueStore,
    batch_size: usize,
    mut on_page: F,
) -> Result<u64>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut scanned = 0u64;
    for shard in 0..store.shard_count() {
        let mut cursor = 0;
        loop {
            let (next, keys) = store.scan(shard, cursor, batch_size).await?;
            scanned += keys.len() as u64;
            if !keys.is_empty() {
                on_page(keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
    }
    Ok(scanned)
}

/// Collect every key of `store` into `keys`.
///
/// `expected` (usually DBSIZE) only feeds the progress log. On error the keys
/// gathered so far remain in `keys`.
pub async fn scan_into(
    store: &dyn KeyValueStore,
    batch_size: usize,
    expected: Option<u64>,
    keys: &mut HashSet<String>,
) -> Result<()> {
    let endpoint = store.endpoint();
    info!("Scanning keys of {}", endpoint);

    let mut last_report = Instant::now();
    let mut scanned = 0u64;
    scan_pages(store, batch_size, |page| {
        scanned += page.len() as u64;
        keys.extend(page);
        if last_report.elapsed() >= PROGRESS_INTERVAL {
            last_report = Instant::now();
            match expected {
                Some(total) => info!(
                    "Scanning keys of {}, scanned {} out of {}",
                    endpoint, scanned, total
                ),
                None => info!("Scanning keys of {}, scanned {}", endpoint, scanned),
            }
        }
        ready(Ok(()))
    })
    .await?;

    info!("Scanned {} distinct keys of {}", keys.len(), endpoint);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompareError;
    use compare_store::{MemoryStore, StoreError};

    #[tokio::test]
    async fn test_scan_into_collects_every_key() {
        let store = MemoryStore::new("mem");
        for i in 0..23 {
            store.set_string(&format!("key:{i}"), "v");
        }

        let mut keys = HashSet::new();
        scan_into(&store, 5, Some(23), &mut keys).await.unwrap();
        assert_eq!(keys.len(), 23);
        assert!(keys.contains("key:22"));
    }

    #[tokio::test]
    async fn test_scan_error_is_returned() {
        let store = MemoryStore::new("mem");
        store.set_string("a", "1");
        store.fail_on("SCAN");

        let mut keys = HashSet::new();
        let err = scan_into(&store, 5, None, &mut keys).await.unwrap_err();
        assert!(matches!(err, CompareError::Store(StoreError::Injected(_))));
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pages_are_not_delivered() {
        let store = MemoryStore::new("mem");
        let mut pages = 0;
        let scanned = scan_pages(&store, 10, |_| {
            pages += 1;
            ready(Ok(()))
        })
        .await
        .unwrap();
        assert_eq!(scanned, 0);
        assert_eq!(pages, 0);
    }
}
