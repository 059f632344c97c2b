//! Whole-database comparison.
//!
//! Unlike [`crate::single`], values are not walked structurally: both key
//! sets are scanned, orphans on either side are reported, and the keys
//! present on both sides are compared by their serialized `DUMP` payload.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use compare_core::{DiffReason, DiffRecord, PairIdentity};
use compare_store::KeyValueStore;
use tracing::{error, info};

use crate::pool::{run_key_workers, BatchWorker};
use crate::recorder::ResultRecorder;
use crate::scanner::scan_into;
use crate::{CompareOptions, PassSummary, Result};

/// Pending keys per worker held in the dispatch channel.
const CHANNEL_KEYS_PER_BATCH: usize = 1000;

pub type StorePair = (Arc<dyn KeyValueStore>, Arc<dyn KeyValueStore>);

/// Partition of two key sets, each list sorted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KeySetDiff {
    pub missing_in_target: Vec<String>,
    pub missing_in_source: Vec<String>,
    pub common: Vec<String>,
}

impl KeySetDiff {
    pub fn between(source: &HashSet<String>, target: &HashSet<String>) -> Self {
        Self {
            missing_in_target: sorted(source.difference(target)),
            missing_in_source: sorted(target.difference(source)),
            common: sorted(source.intersection(target)),
        }
    }
}

fn sorted<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = keys.cloned().collect();
    keys.sort();
    keys
}

/// Compares DUMP payloads for one sub-batch on its own connection pair.
struct DumpWorker {
    source: Arc<dyn KeyValueStore>,
    target: Arc<dyn KeyValueStore>,
    pair: PairIdentity,
    recorder: Arc<ResultRecorder>,
}

#[async_trait]
impl BatchWorker for DumpWorker {
    async fn compare_batch(&mut self, keys: Vec<String>) -> Result<u64> {
        let dumps = tokio::try_join!(
            self.source.dump_batch(&keys),
            self.target.dump_batch(&keys)
        );
        let (source_dumps, target_dumps) = match dumps {
            Ok(dumps) => dumps,
            Err(e) => {
                error!("DUMP pipeline of {} keys failed: {}", keys.len(), e);
                return Ok(0);
            }
        };

        let pairs = keys.iter().zip(&source_dumps).zip(&target_dumps);
        for ((key, source_dump), target_dump) in pairs {
            if source_dump != target_dump {
                let record = self
                    .pair
                    .record(key, None)
                    .mismatch(DiffReason::DumpValueMismatch { key: key.clone() });
                self.recorder.record(&record)?;
            }
        }
        Ok(keys.len() as u64)
    }
}

/// Whole-database differ for one source/target pair.
pub struct BulkCompare {
    source: Arc<dyn KeyValueStore>,
    target: Arc<dyn KeyValueStore>,
    pair: PairIdentity,
    worker_pairs: Vec<StorePair>,
    options: CompareOptions,
}

impl BulkCompare {
    /// Every worker shares `source` and `target` until
    /// [`BulkCompare::with_worker_pairs`] hands out dedicated connections.
    pub fn new(
        source: Arc<dyn KeyValueStore>,
        target: Arc<dyn KeyValueStore>,
        options: CompareOptions,
    ) -> Self {
        let pair = PairIdentity {
            source: source.endpoint(),
            target: target.endpoint(),
            source_db: source.db(),
            target_db: target.db(),
        };
        let worker_pairs = (0..options.threads.max(1))
            .map(|_| (source.clone(), target.clone()))
            .collect();
        Self {
            source,
            target,
            pair,
            worker_pairs,
            options,
        }
    }

    /// One `(source, target)` pair per value-comparison worker.
    pub fn with_worker_pairs(mut self, pairs: Vec<StorePair>) -> Self {
        if !pairs.is_empty() {
            self.worker_pairs = pairs;
        }
        self
    }

    pub async fn compare_db(&self, result_file: &Path) -> Result<PassSummary> {
        let started = Instant::now();
        let recorder = Arc::new(ResultRecorder::new(result_file, self.options.record_result));
        info!(
            "Whole-database comparison of {} against {} started",
            self.pair.source, self.pair.target
        );

        let (source_size, target_size) = self.compare_db_size(&recorder).await?;
        let diff = self.compare_key_sets(source_size, target_size, &recorder).await?;
        let compared = self.compare_values(diff.common, &recorder).await?;

        info!("Whole-database comparison finished");
        Ok(PassSummary::new(&recorder, compared, started.elapsed()))
    }

    async fn compare_db_size(&self, recorder: &ResultRecorder) -> Result<(u64, u64)> {
        info!("Comparing DB size");
        let source = self.source.dbsize().await?;
        let target = self.target.dbsize().await?;
        if source != target {
            let record = DiffRecord::new(&self.pair)
                .mismatch(DiffReason::DbSizeMismatch { source, target });
            recorder.record(&record)?;
        }
        Ok((source, target))
    }

    /// Scan both sides concurrently and record every orphan key.
    async fn compare_key_sets(
        &self,
        source_size: u64,
        target_size: u64,
        recorder: &ResultRecorder,
    ) -> Result<KeySetDiff> {
        info!("Comparing DB keys");
        let batch_size = self.options.batch_size;
        let mut source_keys = HashSet::new();
        let mut target_keys = HashSet::new();
        let (source_scan, target_scan) = tokio::join!(
            scan_into(self.source.as_ref(), batch_size, Some(source_size), &mut source_keys),
            scan_into(self.target.as_ref(), batch_size, Some(target_size), &mut target_keys),
        );
        source_scan?;
        target_scan?;

        let diff = KeySetDiff::between(&source_keys, &target_keys);
        for key in &diff.missing_in_target {
            let record = self
                .pair
                .record(key, None)
                .mismatch(DiffReason::KeyMissingInTarget { key: key.clone() });
            recorder.record(&record)?;
        }
        for key in &diff.missing_in_source {
            let record = self
                .pair
                .record(key, None)
                .mismatch(DiffReason::KeyMissingInSource { key: key.clone() });
            recorder.record(&record)?;
        }
        info!(
            "Comparing DB keys finished: {} only in source, {} only in target, {} common",
            diff.missing_in_target.len(),
            diff.missing_in_source.len(),
            diff.common.len()
        );
        Ok(diff)
    }

    async fn compare_values(
        &self,
        keys: Vec<String>,
        recorder: &Arc<ResultRecorder>,
    ) -> Result<u64> {
        info!("Comparing DB keys values");
        let workers: Vec<DumpWorker> = self
            .worker_pairs
            .iter()
            .map(|(source, target)| DumpWorker {
                source: source.clone(),
                target: target.clone(),
                pair: self.pair.clone(),
                recorder: recorder.clone(),
            })
            .collect();
        let capacity = self.options.batch_size.max(1) * CHANNEL_KEYS_PER_BATCH;
        run_key_workers(keys, workers, self.options.batch_size, capacity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_key_set_diff_both_ways() {
        let diff = KeySetDiff::between(&set(&["k1", "k2", "k3"]), &set(&["k2", "k3", "k4"]));
        assert_eq!(diff.missing_in_target, vec!["k1"]);
        assert_eq!(diff.missing_in_source, vec!["k4"]);
        assert_eq!(diff.common, vec!["k2", "k3"]);
    }
}
