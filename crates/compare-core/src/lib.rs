//! Diff record model for redis-compare.
//!
//! Every comparison in the workspace produces [`DiffRecord`]s. A record is
//! only ever persisted when it is unequal, one JSON object per line, in a
//! result file named `compare_<nanos>.result`:
//!
//! ```json
//! {"Key":"user:1","KeyType":"hash","Source":"10.0.0.1:6379","Target":"10.0.0.2:6379",
//!  "SourceDB":0,"TargetDB":0,"IsEqual":false,
//!  "KeyDiffReason":[{"description":"Field value not equal","field":"b","sourceval":"2","targetval":"3"}]}
//! ```
//!
//! # Architecture
//!
//! ```text
//! compare-core (this crate)
//!    │
//!    ├─── compare-store   (connection trait, Redis and in-memory stores)
//!    ├─── compare-engine  (scanner, worker pool, comparators, replay)
//!    └─── compare-report  (.rep aggregation and parsing)
//! ```

pub mod endpoint;
pub mod key_type;
pub mod reason;
pub mod record;
pub mod result_file;

pub use endpoint::Endpoint;
pub use key_type::KeyType;
pub use reason::DiffReason;
pub use record::{DiffRecord, PairIdentity};
pub use result_file::RecordError;
