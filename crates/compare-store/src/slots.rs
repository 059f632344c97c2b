//! Cluster slot ownership, read from `CLUSTER SLOTS`.
//!
//! Keys are scanned node by node over the addresses the user passed, so a
//! primary left off that list is never scanned.

use redis::{from_redis_value, Value};

/// Number of hash slots in a Redis cluster.
pub const CLUSTER_SLOTS: u32 = 16384;

/// One `CLUSTER SLOTS` entry: an inclusive slot range and its primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRange {
    pub start: u16,
    pub end: u16,
    /// `host:port` of the owning primary.
    pub primary: String,
}

impl SlotRange {
    pub fn slot_count(&self) -> u32 {
        u32::from(self.end.saturating_sub(self.start)) + 1
    }
}

/// How much of the keyspace a set of scanned nodes owns.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SlotCoverage {
    pub covered: u32,
    /// Primaries owning slots that none of the scanned nodes own.
    pub missing: Vec<String>,
}

impl SlotCoverage {
    pub fn is_complete(&self) -> bool {
        self.covered >= CLUSTER_SLOTS
    }
}

/// Parse a `CLUSTER SLOTS` reply: `[[start, end, [host, port, ..], replicas..], ..]`.
///
/// Entries that do not have that shape are skipped.
pub fn parse_cluster_slots(reply: &Value) -> Vec<SlotRange> {
    let Value::Array(entries) = reply else {
        return Vec::new();
    };
    entries.iter().filter_map(parse_entry).collect()
}

fn parse_entry(entry: &Value) -> Option<SlotRange> {
    let Value::Array(items) = entry else {
        return None;
    };
    let [start, end, primary, ..] = items.as_slice() else {
        return None;
    };
    let Value::Array(node) = primary else {
        return None;
    };
    let [host, port, ..] = node.as_slice() else {
        return None;
    };
    let host: String = from_redis_value(host).ok()?;
    let port: u16 = from_redis_value(port).ok()?;
    Some(SlotRange {
        start: from_redis_value(start).ok()?,
        end: from_redis_value(end).ok()?,
        primary: format!("{host}:{port}"),
    })
}

/// Slots owned by any of `scanned`, and the primaries of the rest.
pub fn slot_coverage(ranges: &[SlotRange], scanned: &[String]) -> SlotCoverage {
    let mut coverage = SlotCoverage::default();
    for range in ranges {
        if scanned.iter().any(|a| a.eq_ignore_ascii_case(&range.primary)) {
            coverage.covered += range.slot_count();
        } else if !coverage.missing.contains(&range.primary) {
            coverage.missing.push(range.primary.clone());
        }
    }
    coverage
}
