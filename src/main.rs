//! Command-line interface for redis-compare
//!
//! # Usage Examples
//!
//! ## Compare
//! ```bash
//! # Structural comparison, mismatches written to ./compare_<nanos>.result
//! redis-compare compare \
//!   --source-addr 10.0.0.1:6379 --source-db 0 \
//!   --target-addr 10.0.0.2:6379 --target-db 0
//!
//! # Three passes, five minutes apart, followed by a report
//! redis-compare compare \
//!   --source-addr 10.0.0.1:6379 --target-addr 10.0.0.2:6379 \
//!   --compare-times 3 --compare-interval 5m --report
//!
//! # Whole-database comparison of a cluster against a single node
//! redis-compare compare --mode bulk \
//!   --source-cluster --source-addr n1:7000,n2:7001,n3:7002 \
//!   --target-addr 10.0.0.2:6379
//!
//! # Re-check the keys of an earlier run
//! redis-compare compare \
//!   --source-addr 10.0.0.1:6379 --target-addr 10.0.0.2:6379 \
//!   --replay compare_1700000000000000000.result
//! ```
//!
//! ## Inspect
//! ```bash
//! redis-compare result parse compare_20240101120000.rep
//! redis-compare env --source-addr 10.0.0.1:6379 --target-addr 10.0.0.2:6379
//! ```
//!
//! Every option can also be supplied through its environment variable
//! (`SOURCE_ADDR`, `TARGET_PASSWORD`, `COMPARE_THREADS`, ...).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use compare_engine::{compare_environment, result_files, CompareMode, CompareRun, PassSummary};
use compare_report::table::{format_parameter_table, format_parsed};
use compare_report::{parse_file, write_report, RunMetadata};
use redis_compare::connect::{connect_pair, connect_worker_pairs};
use redis_compare::{CompareArgs, SourceOpts, TargetOpts};

#[derive(Parser)]
#[command(name = "redis-compare")]
#[command(about = "A tool for verifying data consistency between two Redis deployments")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the keys of a source and a target deployment
    Compare {
        /// Source connection options
        #[command(flatten)]
        source: SourceOpts,

        /// Target connection options
        #[command(flatten)]
        target: TargetOpts,

        #[command(flatten)]
        args: CompareArgs,
    },

    /// Inspect result and report files
    #[command(name = "result")]
    ResultFile {
        #[command(subcommand)]
        command: ResultCommand,
    },

    /// Compare server configuration (CONFIG GET *) of source and target
    Env {
        #[command(flatten)]
        source: SourceOpts,

        #[command(flatten)]
        target: TargetOpts,
    },
}

#[derive(Subcommand)]
enum ResultCommand {
    /// Print a .result or .rep file as tables
    Parse {
        /// Path to the file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            source,
            target,
            args,
        } => run_compare(&source, &target, &args).await?,
        Commands::ResultFile {
            command: ResultCommand::Parse { file },
        } => {
            let parsed =
                parse_file(&file).with_context(|| format!("Failed to parse {}", file.display()))?;
            print!("{}", format_parsed(&parsed));
        }
        Commands::Env { source, target } => {
            let (source, target) = connect_pair(&source, &target).await?;
            let record = compare_environment(source.as_ref(), target.as_ref())
                .await
                .context("Failed to compare server configuration")?;
            print!("{}", format_parameter_table(&record));
        }
    }

    Ok(())
}

async fn run_compare(
    source_opts: &SourceOpts,
    target_opts: &TargetOpts,
    args: &CompareArgs,
) -> anyhow::Result<()> {
    let options = args
        .compare_options()
        .normalized()
        .context("Invalid compare options")?;
    let mode = CompareMode::from(args.mode);
    let (source, target) = connect_pair(source_opts, target_opts).await?;

    let compare = match mode {
        CompareMode::Single => {
            CompareRun::single(source.clone(), target.clone(), options.clone(), args.pass_plan())
        }
        CompareMode::Bulk => {
            let pairs = connect_worker_pairs(source_opts, target_opts, options.threads).await?;
            CompareRun::bulk(
                source.clone(),
                target.clone(),
                pairs,
                options.clone(),
                args.pass_plan(),
            )
        }
    };

    let summaries = if args.replay.is_empty() {
        compare.run().await.context("Comparison failed")?
    } else {
        vec![compare
            .replay(&args.replay)
            .await
            .context("Replaying result files failed")?]
    };
    print_summaries(&summaries);

    if args.report {
        let metadata = RunMetadata {
            source: source.endpoint(),
            target: target.endpoint(),
            source_db: source.db(),
            target_db: target.db(),
            batch_size: options.batch_size as u64,
            compare_threads: options.threads as u64,
            ttl_diff: options.ttl_diff_ms,
            mode: mode.to_string(),
        };
        let path = write_report(&options.output_dir, &[metadata], &result_files(&summaries))
            .context("Failed to write report")?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_summaries(summaries: &[PassSummary]) {
    for summary in summaries {
        let file = summary
            .result_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "Pass {}: {} keys compared, {} mismatches in {:.1}s ({})",
            summary.pass,
            summary.keys_compared,
            summary.mismatches,
            summary.elapsed.as_secs_f64(),
            file
        );
    }
}
