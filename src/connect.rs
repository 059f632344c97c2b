use std::sync::Arc;

use anyhow::Context;
use compare_engine::StorePair;
use compare_store::{ConnectOptions, KeyValueStore, RedisStore};
use tracing::info;

use crate::{SourceOpts, TargetOpts};

// Connect to one Redis deployment
pub async fn connect_to_redis(opts: &ConnectOptions, side: &str) -> anyhow::Result<RedisStore> {
    RedisStore::connect(opts)
        .await
        .with_context(|| format!("Failed to connect to {side} {}", opts.addresses.join(",")))
}

/// Connect source and target. Either failure aborts the run.
pub async fn connect_pair(
    source: &SourceOpts,
    target: &TargetOpts,
) -> anyhow::Result<(Arc<dyn KeyValueStore>, Arc<dyn KeyValueStore>)> {
    let source = connect_to_redis(&source.connect_options(), "source").await?;
    let target = connect_to_redis(&target.connect_options(), "target").await?;
    Ok((Arc::new(source), Arc::new(target)))
}

/// Dedicated source/target connections for each whole-database worker.
pub async fn connect_worker_pairs(
    source: &SourceOpts,
    target: &TargetOpts,
    workers: usize,
) -> anyhow::Result<Vec<StorePair>> {
    let mut pairs = Vec::with_capacity(workers);
    for _ in 0..workers {
        pairs.push(connect_pair(source, target).await?);
    }
    info!("Opened {} dedicated worker connection pairs", pairs.len());
    Ok(pairs)
}
