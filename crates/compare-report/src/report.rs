//! Report generation.
//!
//! A report is the metadata of every compared pair on the first line,
//! followed by the unmodified lines of the referenced result files:
//!
//! ```text
//! [{"Source":"10.0.0.1:6379","Target":"10.0.0.2:6379",...}]
//! {"Key":"k7","KeyType":"string",...}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::RunMetadata;

/// Extension of report files (without the dot).
pub const REPORT_EXTENSION: &str = "rep";

/// `compare_<YYYYMMDDhhmmss>.rep`
pub fn report_file_name(at: DateTime<Local>) -> String {
    format!("compare_{}.{REPORT_EXTENSION}", at.format("%Y%m%d%H%M%S"))
}

/// Write a report into `dir`, named after the current local time.
///
/// Result files that do not exist (passes that found nothing) are skipped.
pub fn write_report(
    dir: &Path,
    metadata: &[RunMetadata],
    result_files: &[PathBuf],
) -> Result<PathBuf> {
    let path = dir.join(report_file_name(Local::now()));
    write_report_to(&path, metadata, result_files)?;
    Ok(path)
}

/// Write a report to an explicit path, replacing any existing file.
pub fn write_report_to(
    path: &Path,
    metadata: &[RunMetadata],
    result_files: &[PathBuf],
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    serde_json::to_writer(&mut out, metadata).context("Failed to serialize run metadata")?;
    out.write_all(b"\n")?;

    let mut lines = 0usize;
    for result in result_files {
        if !result.exists() {
            continue;
        }
        let reader = BufReader::new(
            File::open(result)
                .with_context(|| format!("Failed to open result file {}", result.display()))?,
        );
        for line in reader.lines() {
            let line =
                line.with_context(|| format!("Failed to read result file {}", result.display()))?;
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
            lines += 1;
        }
    }
    out.flush()
        .with_context(|| format!("Failed to write report file {}", path.display()))?;

    info!("Report written to {} ({} records)", path.display(), lines);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 8, 17, 39, 29).unwrap();
        assert_eq!(report_file_name(at), "compare_20240308173929.rep");
    }
}
