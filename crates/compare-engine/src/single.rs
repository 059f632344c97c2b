//! Structural comparison of one source/target pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use compare_core::result_file::read_keys;
use compare_store::KeyValueStore;
use tracing::{error, info};

use crate::comparator::PairComparator;
use crate::pool::BatchPool;
use crate::recorder::ResultRecorder;
use crate::scanner::{scan_pages, PROGRESS_INTERVAL};
use crate::{CompareOptions, PassSummary, Result};

/// Scans the source keyspace and compares every key type by type.
pub struct SingleCompare {
    comparator: PairComparator,
    options: CompareOptions,
}

impl SingleCompare {
    pub fn new(
        source: Arc<dyn KeyValueStore>,
        target: Arc<dyn KeyValueStore>,
        options: CompareOptions,
    ) -> Self {
        Self {
            comparator: PairComparator::new(source, target, &options),
            options,
        }
    }

    pub fn comparator(&self) -> &PairComparator {
        &self.comparator
    }

    fn pool(&self, recorder: &Arc<ResultRecorder>) -> BatchPool<Vec<String>> {
        let comparator = self.comparator.clone();
        let recorder = recorder.clone();
        BatchPool::spawn(self.options.threads, move |keys: Vec<String>| {
            let comparator = comparator.clone();
            let recorder = recorder.clone();
            async move { comparator.compare_keys(&keys, &recorder).await }
        })
    }

    /// Full pass: every source key, written to `result_file`.
    ///
    /// A failing SCAN is logged and ends the scan; keys already dispatched are
    /// still compared.
    pub async fn compare_db(&self, result_file: &Path) -> Result<PassSummary> {
        let started = Instant::now();
        let recorder = Arc::new(ResultRecorder::new(result_file, self.options.record_result));
        let pool = self.pool(&recorder);
        let source = self.comparator.source();

        info!("Comparing {} against {}", source.endpoint(), self.comparator.pair().target);
        let queue = &pool;
        let mut last_report = Instant::now();
        let mut dispatched = 0u64;
        let scan = scan_pages(source.as_ref(), self.options.batch_size, move |page| {
            dispatched += page.len() as u64;
            if last_report.elapsed() >= PROGRESS_INTERVAL {
                last_report = Instant::now();
                info!("Comparing... {} keys dispatched", dispatched);
            }
            queue.submit(page)
        })
        .await;
        if let Err(e) = &scan {
            error!("Scan of {} aborted: {}", source.endpoint(), e);
        }

        let keys_compared = pool.join().await?;
        Ok(PassSummary::new(&recorder, keys_compared, started.elapsed()))
    }

    /// Re-compare only the keys named in `files`, writing to `result_file`.
    pub async fn compare_from_results(
        &self,
        files: &[PathBuf],
        result_file: &Path,
    ) -> Result<PassSummary> {
        let started = Instant::now();
        let recorder = Arc::new(ResultRecorder::new(result_file, self.options.record_result));
        let pool = self.pool(&recorder);

        for file in files {
            let keys = read_keys(file)?;
            info!("Replaying {} keys from {}", keys.len(), file.display());
            for chunk in keys.chunks(self.options.batch_size.max(1)) {
                pool.submit(chunk.to_vec()).await?;
            }
        }

        let keys_compared = pool.join().await?;
        Ok(PassSummary::new(&recorder, keys_compared, started.elapsed()))
    }
}
