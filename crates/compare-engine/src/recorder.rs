//! Mismatch persistence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use compare_core::result_file::{append_line, RESULT_EXTENSION};
use compare_core::{DiffRecord, RecordError};
use tracing::{debug, info};

use crate::{CompareError, Result};

/// Appends unequal records to one result file.
///
/// Shared by every worker of a pass. Appends are serialized so lines never
/// interleave; equal records are dropped.
#[derive(Debug)]
pub struct ResultRecorder {
    path: PathBuf,
    enabled: bool,
    write_lock: Mutex<()>,
    mismatches: AtomicU64,
}

impl ResultRecorder {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
            write_lock: Mutex::new(()),
            mismatches: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log and persist `record` if it is unequal.
    pub fn record(&self, record: &DiffRecord) -> Result<()> {
        if record.is_equal {
            return Ok(());
        }
        self.mismatches.fetch_add(1, Ordering::Relaxed);

        let line = record.to_json_line().map_err(|source| RecordError::Parse {
            path: self.path.clone(),
            line: 0,
            source,
        })?;
        info!(compare_result = %line, "Mismatch found");

        if !self.enabled {
            return Ok(());
        }
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        append_line(&self.path, &line)?;
        Ok(())
    }

    /// Unequal records seen so far.
    pub fn mismatches(&self) -> u64 {
        self.mismatches.load(Ordering::Relaxed)
    }

    /// True once at least one record has been written to disk.
    pub fn has_output(&self) -> bool {
        self.enabled && self.path.exists()
    }
}

/// Remove every `*.result` file directly inside `dir`, except `keep`.
///
/// Returns the removed paths. The first file that cannot be removed aborts
/// the cleanup with an error.
pub fn remove_stale_results(dir: &Path, keep: Option<&Path>) -> Result<Vec<PathBuf>> {
    let cleanup_err = |path: &Path, source| CompareError::Cleanup {
        path: path.to_path_buf(),
        source,
    };

    let keep = keep.and_then(|p| p.canonicalize().ok());
    let entries = std::fs::read_dir(dir).map_err(|e| cleanup_err(dir, e))?;

    let mut removed = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| cleanup_err(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(RESULT_EXTENSION) {
            continue;
        }
        if keep.is_some() && path.canonicalize().ok() == keep {
            debug!("Keeping caller supplied result file {}", path.display());
            continue;
        }
        std::fs::remove_file(&path).map_err(|e| cleanup_err(&path, e))?;
        removed.push(path);
    }

    if !removed.is_empty() {
        info!("Removed {} stale result file(s) from {}", removed.len(), dir.display());
    }
    Ok(removed)
}
