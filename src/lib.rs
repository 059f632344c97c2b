//! Redis Compare Library
//!
//! A library for verifying that two Redis deployments hold the same data,
//! typically after a migration or while replication is catching up.
//!
//! # Features
//!
//! - Structural comparison: per-type checks of existence, length, TTL and content
//! - Whole-database comparison: key-set diff plus DUMP comparison of common keys
//! - Repeated passes: later passes re-check only the keys that differed
//! - Reports: run metadata and mismatches merged into one file
//! - Environment diff: `CONFIG GET *` compared between both sides
//!
//! # Crates
//!
//! - `compare_core` - diff records, reasons and the result-file format
//! - `compare_store` - the `KeyValueStore` seam and its Redis implementation
//! - `compare_engine` - comparators, worker pools and the pass loop
//! - `compare_report` - report generation, parsing and tables
//!
//! # CLI Usage
//!
//! ```bash
//! # Structural comparison of two single nodes
//! redis-compare compare --source-addr 10.0.0.1:6379 --target-addr 10.0.0.2:6379
//!
//! # Cluster source, three passes one minute apart, with a report
//! redis-compare compare --source-cluster --source-addr n1:7000,n2:7001,n3:7002 \
//!     --target-addr 10.0.0.2:6379 --compare-times 3 --compare-interval 1m --report
//!
//! # Whole-database comparison
//! redis-compare compare --mode bulk --source-addr ... --target-addr ...
//!
//! # Render a result or report file
//! redis-compare result parse compare_20240101120000.rep
//!
//! # Compare server configuration
//! redis-compare env --source-addr ... --target-addr ...
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use compare_engine::{
    CompareMode, CompareOptions, PassPlan, DEFAULT_BATCH_SIZE, DEFAULT_TTL_DIFF_MS,
};
use compare_store::ConnectOptions;

pub mod config;
pub mod connect;

pub use config::{parse_duration_to_secs, parse_interval};

#[derive(Args, Clone, Debug)]
pub struct SourceOpts {
    /// Source address (host:port). Pass every master, comma separated, for a cluster
    #[arg(
        long,
        alias = "saddr",
        env = "SOURCE_ADDR",
        value_delimiter = ',',
        required = true
    )]
    pub source_addr: Vec<String>,

    /// Source username (ACL)
    #[arg(long, env = "SOURCE_USERNAME")]
    pub source_username: Option<String>,

    /// Source password
    #[arg(long, alias = "spassword", env = "SOURCE_PASSWORD")]
    pub source_password: Option<String>,

    /// Source logical database
    #[arg(long, alias = "sdb", default_value_t = 0, env = "SOURCE_DB")]
    pub source_db: i64,

    /// Treat the source addresses as cluster masters
    #[arg(long, env = "SOURCE_CLUSTER")]
    pub source_cluster: bool,
}

impl SourceOpts {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            addresses: self.source_addr.clone(),
            username: self.source_username.clone(),
            password: None,
            db: self.source_db,
            cluster: self.source_cluster,
        }
        .with_password(self.source_password.clone())
    }
}

#[derive(Args, Clone, Debug)]
pub struct TargetOpts {
    /// Target address (host:port). Pass every master, comma separated, for a cluster
    #[arg(
        long,
        alias = "taddr",
        env = "TARGET_ADDR",
        value_delimiter = ',',
        required = true
    )]
    pub target_addr: Vec<String>,

    /// Target username (ACL)
    #[arg(long, env = "TARGET_USERNAME")]
    pub target_username: Option<String>,

    /// Target password
    #[arg(long, alias = "tpassword", env = "TARGET_PASSWORD")]
    pub target_password: Option<String>,

    /// Target logical database
    #[arg(long, alias = "tdb", default_value_t = 0, env = "TARGET_DB")]
    pub target_db: i64,

    /// Treat the target addresses as cluster masters
    #[arg(long, env = "TARGET_CLUSTER")]
    pub target_cluster: bool,
}

impl TargetOpts {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            addresses: self.target_addr.clone(),
            username: self.target_username.clone(),
            password: None,
            db: self.target_db,
            cluster: self.target_cluster,
        }
        .with_password(self.target_password.clone())
    }
}

/// Strategy for the first, full pass.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModeArg {
    /// Structural per-type comparison of every source key
    #[default]
    Single,
    /// Key-set diff plus DUMP comparison of the common keys
    Bulk,
}

impl From<ModeArg> for CompareMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => CompareMode::Single,
            ModeArg::Bulk => CompareMode::Bulk,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct CompareArgs {
    /// Comparison strategy for the first pass
    #[arg(long, value_enum, default_value_t = ModeArg::Single, env = "COMPARE_MODE")]
    pub mode: ModeArg,

    /// Keys per SCAN page, list window and DUMP pipeline (0 uses the default)
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, env = "COMPARE_BATCH_SIZE")]
    pub batch_size: usize,

    /// Number of comparison workers (0 uses the number of CPUs)
    #[arg(long, default_value_t = 0, env = "COMPARE_THREADS")]
    pub threads: usize,

    /// Largest tolerated TTL difference in milliseconds
    #[arg(long, default_value_t = DEFAULT_TTL_DIFF_MS, env = "COMPARE_TTL_DIFF")]
    pub ttl_diff: i64,

    /// Number of passes. Passes after the first re-check the previous pass's mismatches
    #[arg(long, default_value_t = 1, env = "COMPARE_TIMES")]
    pub compare_times: u32,

    /// Wait between passes (e.g., "30", "30s", "5m", "1h")
    #[arg(long, default_value = "0", value_parser = parse_interval, env = "COMPARE_INTERVAL")]
    pub compare_interval: Duration,

    /// Write a compare_<timestamp>.rep report after the run
    #[arg(long)]
    pub report: bool,

    /// Result file for the first pass (default: a new compare_<nanos>.result)
    #[arg(long, env = "COMPARE_RESULT_FILE")]
    pub result_file: Option<PathBuf>,

    /// Directory for result and report files
    #[arg(long, default_value = ".", env = "COMPARE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Only log mismatches, do not write result files
    #[arg(long)]
    pub no_record: bool,

    /// Re-check the keys listed in existing result files instead of a full pass
    #[arg(long, value_delimiter = ',')]
    pub replay: Vec<PathBuf>,
}

impl CompareArgs {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            batch_size: self.batch_size,
            threads: self.threads,
            ttl_diff_ms: self.ttl_diff,
            record_result: !self.no_record,
            output_dir: self.output_dir.clone(),
            result_file: self.result_file.clone(),
        }
    }

    pub fn pass_plan(&self) -> PassPlan {
        PassPlan {
            times: self.compare_times.max(1),
            interval: self.compare_interval,
        }
    }
}
