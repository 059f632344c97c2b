//! Reading `.result` and `.rep` files back.

use std::path::Path;

use anyhow::{bail, Context, Result};
use compare_core::result_file::{read_lines, RESULT_EXTENSION};
use compare_core::DiffRecord;
use tracing::warn;

use crate::{RunMetadata, REPORT_EXTENSION};

/// Contents of a parsed result or report file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// Empty for `.result` files.
    pub metadata: Vec<RunMetadata>,
    pub records: Vec<DiffRecord>,
    /// Lines that were not valid records.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Result,
    Report,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(RESULT_EXTENSION) => Some(FileKind::Result),
        Some(REPORT_EXTENSION) => Some(FileKind::Report),
        _ => None,
    }
}

/// Parse a result or report file. Any other extension is rejected.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    let Some(kind) = file_kind(path) else {
        bail!(
            "File must have suffix '.{RESULT_EXTENSION}' or '.{REPORT_EXTENSION}': {}",
            path.display()
        );
    };

    let lines = read_lines(path)?;
    let mut parsed = ParsedFile::default();
    let mut body = lines.iter().enumerate();

    if kind == FileKind::Report {
        if let Some((_, first)) = body.next() {
            parsed.metadata = serde_json::from_str(first)
                .with_context(|| format!("Invalid report metadata in {}", path.display()))?;
        }
    }

    for (idx, line) in body {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DiffRecord>(line) {
            Ok(record) => parsed.records.push(record),
            Err(e) => {
                warn!("Skipping {}:{}: {}", path.display(), idx + 1, e);
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}
