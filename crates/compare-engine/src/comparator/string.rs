use compare_core::DiffReason;
use compare_store::{KeyValueStore, StoreResult};

use super::text;

/// Byte-exact GET comparison. A value that vanished reads as empty.
pub(super) async fn compare_value(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Option<DiffReason>> {
    let source_val = source.get(key).await?.unwrap_or_default();
    let target_val = target.get(key).await?.unwrap_or_default();
    Ok((source_val != target_val).then(|| DiffReason::StringValueMismatch {
        source: text(&source_val),
        target: text(&target_val),
    }))
}
