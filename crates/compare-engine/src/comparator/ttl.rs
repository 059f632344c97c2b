use compare_core::DiffReason;
use compare_store::{KeyValueStore, StoreResult};

/// Remaining lifetime in milliseconds. Keys without expiry (-1) and missing
/// keys (-2) both count as 0.
async fn remaining_ms(store: &dyn KeyValueStore, key: &str) -> StoreResult<i64> {
    Ok(store.pttl(key).await?.max(0))
}

/// `target - source` must stay within `tolerance_ms` either way.
pub(super) async fn compare_ttl(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
    tolerance_ms: i64,
) -> StoreResult<Option<DiffReason>> {
    let source_ttl = remaining_ms(source, key).await?;
    let target_ttl = remaining_ms(target, key).await?;
    let diff = target_ttl - source_ttl;
    Ok((diff.abs() > tolerance_ms).then_some(DiffReason::TtlMismatch {
        diff,
        source_ttl,
        target_ttl,
    }))
}
