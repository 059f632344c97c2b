use compare_core::{DiffReason, KeyType};
use compare_store::{KeyValueStore, StoreResult};

pub(super) async fn compare_existence(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Option<DiffReason>> {
    let in_source = source.exists(key).await?;
    let in_target = target.exists(key).await?;
    Ok((in_source != in_target).then_some(DiffReason::KeyExistence {
        source: in_source,
        target: in_target,
    }))
}

async fn length(store: &dyn KeyValueStore, key: &str, key_type: KeyType) -> StoreResult<u64> {
    match key_type {
        KeyType::List => store.llen(key).await,
        KeyType::Set => store.scard(key).await,
        KeyType::Hash => store.hlen(key).await,
        KeyType::Zset => store.zcard(key).await,
        KeyType::String => Ok(0),
    }
}

/// LLEN / SCARD / HLEN / ZCARD equality.
pub(super) async fn compare_length(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
    key: &str,
    key_type: KeyType,
) -> StoreResult<Option<DiffReason>> {
    let source_len = length(source, key, key_type).await?;
    let target_len = length(target, key, key_type).await?;
    Ok((source_len != target_len).then_some(DiffReason::LengthMismatch {
        key_type,
        source: source_len,
        target: target_len,
    }))
}
