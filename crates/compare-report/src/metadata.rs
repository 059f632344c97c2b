//! Per-pair run metadata, the first line of a report.

use compare_core::Endpoint;
use serde::{Deserialize, Serialize};

/// Parameters of one compared source/target pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(rename = "Source", default)]
    pub source: Endpoint,
    #[serde(rename = "Target", default)]
    pub target: Endpoint,
    #[serde(rename = "SourceDB", default)]
    pub source_db: i64,
    #[serde(rename = "TargetDB", default)]
    pub target_db: i64,
    #[serde(rename = "BatchSize", default)]
    pub batch_size: u64,
    #[serde(rename = "CompareThreads", default)]
    pub compare_threads: u64,
    /// TTL tolerance in milliseconds.
    #[serde(rename = "TTLDiff", default)]
    pub ttl_diff: i64,
    /// `single` or `bulk`.
    #[serde(rename = "Mode", default)]
    pub mode: String,
}
