//! Report aggregation for redis-compare.
//!
//! - [`write_report`] merges run metadata and result files into a
//!   `compare_<YYYYMMDDhhmmss>.rep` file.
//! - [`parse_file`] reads a `.result` or `.rep` file back.
//! - [`table`] renders parsed files and environment diffs as text tables.

mod metadata;
mod parse;
mod report;
pub mod table;

pub use metadata::RunMetadata;
pub use parse::{parse_file, ParsedFile};
pub use report::{report_file_name, write_report, write_report_to, REPORT_EXTENSION};
