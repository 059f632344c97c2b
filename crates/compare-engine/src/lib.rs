//! Comparison engine for redis-compare.
//!
//! Given two connected [`compare_store::KeyValueStore`]s, the engine walks
//! the source keyspace, compares every key against the target and appends a
//! [`compare_core::DiffRecord`] for each difference to a result file.
//!
//! Two strategies are provided:
//!
//! - [`SingleCompare`]: scan pages are dispatched to a bounded worker pool;
//!   each key is classified with `TYPE` and compared structurally
//!   (existence, length, TTL, contents).
//! - [`BulkCompare`]: DBSIZE and key-set comparison of both sides, then a
//!   DUMP comparison of the shared keys by long-lived per-connection workers.
//!
//! [`CompareRun`] wraps either strategy with stale result cleanup and the
//! "compare N times with an interval" loop, where later passes only re-check
//! the keys recorded by the previous pass.
//!
//! The engine never writes to either store.

pub mod bulk;
pub mod comparator;
pub mod environment;
mod error;
mod options;
pub mod passes;
pub mod pool;
pub mod recorder;
pub mod scanner;
pub mod single;

pub use bulk::{BulkCompare, KeySetDiff, StorePair};
pub use comparator::PairComparator;
pub use environment::compare_environment;
pub use error::{CompareError, Result};
pub use options::{CompareOptions, DEFAULT_BATCH_SIZE, DEFAULT_TTL_DIFF_MS};
pub use passes::{result_files, CompareMode, CompareRun, PassPlan, PassSummary};
pub use recorder::{remove_stale_results, ResultRecorder};
pub use single::SingleCompare;
