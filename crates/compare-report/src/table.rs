//! Human readable tables.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use compare_core::{DiffReason, DiffRecord, Endpoint};

use crate::{ParsedFile, RunMetadata};

/// Cluster endpoints are listed one node per line.
fn endpoint_cell(endpoint: &Endpoint) -> String {
    endpoint.addresses().join("\n")
}

fn reasons_cell(reasons: &[DiffReason]) -> String {
    serde_json::to_string(reasons).unwrap_or_default()
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn format_metadata_table(metadata: &[RunMetadata]) -> String {
    let mut table = new_table(vec![
        "Source",
        "Target",
        "SourceDB",
        "TargetDB",
        "BatchSize",
        "CompareThreads",
        "TTLDiff",
        "Mode",
    ]);
    for meta in metadata {
        table.add_row(vec![
            Cell::new(endpoint_cell(&meta.source)),
            Cell::new(endpoint_cell(&meta.target)),
            Cell::new(meta.source_db),
            Cell::new(meta.target_db),
            Cell::new(meta.batch_size),
            Cell::new(meta.compare_threads),
            Cell::new(meta.ttl_diff),
            Cell::new(&meta.mode),
        ]);
    }
    table.to_string()
}

pub fn format_records_table(records: &[DiffRecord]) -> String {
    let mut table = new_table(vec![
        "Source",
        "Target",
        "Key",
        "SourceDB",
        "TargetDB",
        "KeyDiffReason",
    ]);
    for record in records {
        table.add_row(vec![
            Cell::new(endpoint_cell(&record.source)),
            Cell::new(endpoint_cell(&record.target)),
            Cell::new(&record.key),
            Cell::new(record.source_db),
            Cell::new(record.target_db),
            Cell::new(reasons_cell(&record.reasons)),
        ]);
    }
    table.to_string()
}

/// Metadata table (reports only), then the records table.
pub fn format_parsed(parsed: &ParsedFile) -> String {
    let mut output = String::new();
    if !parsed.metadata.is_empty() {
        output.push_str(&format_metadata_table(&parsed.metadata));
        output.push('\n');
    }
    output.push_str(&format_records_table(&parsed.records));
    output.push_str(&format!("\n{} record(s)", parsed.records.len()));
    if parsed.skipped > 0 {
        output.push_str(&format!(", {} unreadable line(s) skipped", parsed.skipped));
    }
    output.push('\n');
    output
}

/// Parameter differences of an environment comparison.
pub fn format_parameter_table(record: &DiffRecord) -> String {
    let mut table = new_table(vec!["Parameter", "Source", "Target"]);
    for reason in &record.reasons {
        if let DiffReason::ParameterMismatch {
            parameter,
            source,
            target,
        } = reason
        {
            table.add_row(vec![
                Cell::new(parameter).fg(Color::Yellow),
                Cell::new(source),
                Cell::new(target),
            ]);
        }
    }

    let mut output = table.to_string();
    if record.is_equal {
        output.push_str("\nAll compared parameters are equal\n");
    } else {
        output.push_str(&format!("\n{} parameter(s) differ\n", record.reasons.len()));
    }
    output
}
