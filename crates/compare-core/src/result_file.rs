//! Result file naming, appending and reading.
//!
//! A result file is newline-delimited JSON, one [`DiffRecord`] per line.
//! Appends open the file, write one complete line with a single
//! `write_all`, and close it again, so an interrupted run leaves every
//! previously written line intact.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::DiffRecord;

/// Extension of result files (without the dot).
pub const RESULT_EXTENSION: &str = "result";

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Errors reading or writing result files.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("I/O error on result file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Nanoseconds since the Unix epoch, strictly increasing within the process
/// so two passes started in the same tick still get distinct files.
pub fn monotonic_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(seen) => last = seen,
        }
    }
}

/// `compare_<nanos>.result`
pub fn result_file_name(stamp: u64) -> String {
    format!("compare_{stamp}.{RESULT_EXTENSION}")
}

/// Fresh result file path inside `dir`.
pub fn new_result_path(dir: &Path) -> PathBuf {
    dir.join(result_file_name(monotonic_stamp()))
}

/// Append one record as a single JSON line.
pub fn append_record(path: &Path, record: &DiffRecord) -> Result<(), RecordError> {
    let line = record.to_json_line().map_err(|source| RecordError::Parse {
        path: path.to_path_buf(),
        line: 0,
        source,
    })?;
    append_line(path, &line)
}

/// Append an already serialized record line.
pub fn append_line(path: &Path, line: &str) -> Result<(), RecordError> {
    let io_err = |source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(format!("{line}\n").as_bytes()).map_err(io_err)
}

/// Read every record of a result file. Blank lines are skipped.
pub fn read_records(path: &Path) -> Result<Vec<DiffRecord>, RecordError> {
    let mut records = Vec::new();
    for (idx, line) in read_lines(path)?.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| RecordError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Extract the non-empty `Key` of every line.
///
/// Lines that are not JSON objects (a report's metadata array, garbage) and
/// records without a key (database-level records) contribute nothing.
pub fn read_keys(path: &Path) -> Result<Vec<String>, RecordError> {
    let keys = read_lines(path)?
        .iter()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|value| {
            value
                .get("Key")
                .and_then(serde_json::Value::as_str)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(keys)
}

/// All lines of a file, unmodified.
pub fn read_lines(path: &Path) -> Result<Vec<String>, RecordError> {
    let io_err = |source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_err)?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiffReason, Endpoint, KeyType, PairIdentity};
    use tempfile::TempDir;

    fn record(key: &str) -> DiffRecord {
        let pair = PairIdentity {
            source: Endpoint::Single("s:1".into()),
            target: Endpoint::Single("t:1".into()),
            source_db: 0,
            target_db: 0,
        };
        pair.record(key, Some(KeyType::Set))
            .mismatch(DiffReason::SetMemberMissing {
                member: "m".into(),
            })
    }

    #[test]
    fn test_stamps_are_strictly_increasing() {
        let a = monotonic_stamp();
        let b = monotonic_stamp();
        assert!(b > a);
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(result_file_name(42), "compare_42.result");
    }

    #[test]
    fn test_append_then_read() {
        let dir = TempDir::new().unwrap();
        let path = new_result_path(dir.path());

        append_record(&path, &record("k1")).unwrap();
        append_record(&path, &record("k2")).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key, "k2");
        assert_eq!(read_keys(&path).unwrap(), vec!["k1", "k2"]);
    }

    #[test]
    fn test_read_keys_skips_metadata_and_empty_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.rep");
        std::fs::write(
            &path,
            "[{\"Source\":\"s\"}]\n{\"Key\":\"\",\"IsEqual\":false}\n{\"Key\":\"a\"}\nnot json\n",
        )
        .unwrap();
        assert_eq!(read_keys(&path).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_keys(Path::new("/nonexistent/compare_1.result")).unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
    }
}
