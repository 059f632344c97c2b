//! Tunables shared by every comparison strategy.

use std::path::PathBuf;

use crate::{CompareError, Result};

/// Keys per SCAN page, list window and DUMP pipeline.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Largest tolerated TTL difference in milliseconds.
pub const DEFAULT_TTL_DIFF_MS: i64 = 10_000;

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub batch_size: usize,
    /// Worker count. Defaults to the number of CPUs.
    pub threads: usize,
    pub ttl_diff_ms: i64,
    /// When false, mismatches are only logged.
    pub record_result: bool,
    /// Directory that receives generated result files.
    pub output_dir: PathBuf,
    /// Explicit result file for the first pass. Never removed by cleanup.
    pub result_file: Option<PathBuf>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            threads: num_cpus::get(),
            ttl_diff_ms: DEFAULT_TTL_DIFF_MS,
            record_result: true,
            output_dir: PathBuf::from("."),
            result_file: None,
        }
    }
}

impl CompareOptions {
    /// Replace zero sizes with the defaults and reject negative tolerances.
    pub fn normalized(mut self) -> Result<Self> {
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        if self.threads == 0 {
            self.threads = num_cpus::get();
        }
        if self.ttl_diff_ms < 0 {
            return Err(CompareError::InvalidOptions(format!(
                "TTL tolerance must not be negative, got {}",
                self.ttl_diff_ms
            )));
        }
        Ok(self)
    }
}
