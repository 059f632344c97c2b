//! Repeated passes: one full comparison, then re-checks of whatever the
//! previous pass recorded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use compare_core::result_file::new_result_path;
use compare_store::KeyValueStore;
use tracing::info;

use crate::bulk::{BulkCompare, StorePair};
use crate::recorder::{remove_stale_results, ResultRecorder};
use crate::single::SingleCompare;
use crate::{CompareOptions, Result};

/// Which strategy runs the first, full pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompareMode {
    /// Structural per-type comparison of every source key.
    #[default]
    Single,
    /// Key-set diff plus DUMP comparison of the common keys.
    Bulk,
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareMode::Single => write!(f, "single"),
            CompareMode::Bulk => write!(f, "bulk"),
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone)]
pub struct PassSummary {
    /// 1-based pass number.
    pub pass: u32,
    /// The result file, if anything was written to it.
    pub result_file: Option<PathBuf>,
    pub keys_compared: u64,
    pub mismatches: u64,
    pub elapsed: Duration,
}

/// Result files of every pass that wrote one, in pass order.
pub fn result_files(summaries: &[PassSummary]) -> Vec<PathBuf> {
    summaries
        .iter()
        .filter_map(|s| s.result_file.clone())
        .collect()
}

impl PassSummary {
    pub(crate) fn new(recorder: &ResultRecorder, keys_compared: u64, elapsed: Duration) -> Self {
        Self {
            pass: 1,
            result_file: recorder.has_output().then(|| recorder.path().to_path_buf()),
            keys_compared,
            mismatches: recorder.mismatches(),
            elapsed,
        }
    }
}

/// How many passes to run and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub times: u32,
    pub interval: Duration,
}

impl Default for PassPlan {
    fn default() -> Self {
        Self {
            times: 1,
            interval: Duration::ZERO,
        }
    }
}

/// A configured comparison of one source/target pair.
pub struct CompareRun {
    single: SingleCompare,
    bulk: Option<BulkCompare>,
    options: CompareOptions,
    plan: PassPlan,
}

impl CompareRun {
    pub fn single(
        source: Arc<dyn KeyValueStore>,
        target: Arc<dyn KeyValueStore>,
        options: CompareOptions,
        plan: PassPlan,
    ) -> Self {
        Self {
            single: SingleCompare::new(source, target, options.clone()),
            bulk: None,
            options,
            plan,
        }
    }

    /// Whole-database first pass. `worker_pairs` may be empty, in which case
    /// the workers share `source` and `target`.
    pub fn bulk(
        source: Arc<dyn KeyValueStore>,
        target: Arc<dyn KeyValueStore>,
        worker_pairs: Vec<StorePair>,
        options: CompareOptions,
        plan: PassPlan,
    ) -> Self {
        let bulk = BulkCompare::new(source.clone(), target.clone(), options.clone())
            .with_worker_pairs(worker_pairs);
        Self {
            single: SingleCompare::new(source, target, options.clone()),
            bulk: Some(bulk),
            options,
            plan,
        }
    }

    pub fn mode(&self) -> CompareMode {
        match self.bulk {
            Some(_) => CompareMode::Bulk,
            None => CompareMode::Single,
        }
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Run every planned pass.
    ///
    /// Stale result files in the output directory are removed first. Later
    /// passes replay the previous pass's file through the per-key pipeline
    /// and stop early once a pass records nothing.
    pub async fn run(&self) -> Result<Vec<PassSummary>> {
        if self.options.record_result {
            remove_stale_results(&self.options.output_dir, self.options.result_file.as_deref())?;
        }

        let first_path = self
            .options
            .result_file
            .clone()
            .unwrap_or_else(|| new_result_path(&self.options.output_dir));
        let first = self.full_pass(&first_path).await?;
        log_summary(&first);

        let mut summaries = vec![first];
        for pass in 2..=self.plan.times.max(1) {
            let Some(previous) = summaries.last().and_then(|s| s.result_file.clone()) else {
                info!("No mismatches left to re-check, skipping remaining passes");
                break;
            };

            info!("Waiting {:?} before pass {}", self.plan.interval, pass);
            tokio::time::sleep(self.plan.interval).await;

            let path = new_result_path(&self.options.output_dir);
            let mut summary = self.single.compare_from_results(&[previous], &path).await?;
            summary.pass = pass;
            log_summary(&summary);
            summaries.push(summary);
        }
        Ok(summaries)
    }

    async fn full_pass(&self, path: &Path) -> Result<PassSummary> {
        match &self.bulk {
            Some(bulk) => bulk.compare_db(path).await,
            None => self.single.compare_db(path).await,
        }
    }

    /// Replay previously recorded keys once, outside the pass loop.
    pub async fn replay(&self, files: &[PathBuf]) -> Result<PassSummary> {
        let path = self
            .options
            .result_file
            .clone()
            .unwrap_or_else(|| new_result_path(&self.options.output_dir));
        let summary = self.single.compare_from_results(files, &path).await?;
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &PassSummary) {
    info!(
        pass = summary.pass,
        keys_compared = summary.keys_compared,
        mismatches = summary.mismatches,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Pass finished{}",
        summary
            .result_file
            .as_ref()
            .map(|p| format!(", mismatches written to {}", p.display()))
            .unwrap_or_default()
    );
}
