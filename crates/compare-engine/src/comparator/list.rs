use compare_core::DiffReason;
use compare_store::{KeyValueStore, StoreResult};

use super::text;

/// Inclusive `[start, stop]` LRANGE windows of `window` items covering `len`.
fn windows(len: u64, window: u64) -> impl Iterator<Item = (u64, u64)> {
    (0..len)
        .step_by(window as usize)
        .map(move |start| (start, (start + window).min(len) - 1))
}

/// Positional comparison, one window at a time. Lengths have already been
/// checked, so the source length drives the walk.
pub(super) async fn compare_items(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
    batch_size: usize,
) -> StoreResult<Option<DiffReason>> {
    let len = source.llen(key).await?;
    for (start, stop) in windows(len, batch_size.max(1) as u64) {
        let source_items = source.lrange(key, start as i64, stop as i64).await?;
        let target_items = target.lrange(key, start as i64, stop as i64).await?;

        for (offset, item) in source_items.iter().enumerate() {
            let other = target_items.get(offset);
            if other != Some(item) {
                return Ok(Some(DiffReason::ListIndexMismatch {
                    index: start + offset as u64,
                    source: text(item),
                    target: other.map(|v| text(v)).unwrap_or_default(),
                }));
            }
        }
    }
    Ok(None)
}
