//! Snapkeep CLI - snapshot retention and space-reclamation controller
//!
//! One invocation is one run: snapshot every dataset in the target pool,
//! collapse aged intraday snapshots, and evict oldest-first while the
//! pool's free space sits below the floor. Meant to be driven by cron.

use anyhow::Result;
use clap::Parser;
use engine::ZfsEngine;
use owo_colors::OwoColorize;
use retention::{RunConfig, RunReport};
use std::sync::Arc;

mod locks;
mod logging;

/// Snapkeep - rolling pool snapshots with age- and space-driven retention
#[derive(Parser)]
#[command(name = "snapkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pool to snapshot and reclaim space on
    pool: String,

    /// Minimum free space to maintain, in GiB
    #[arg(default_value_t = 200)]
    min_free: u64,

    /// Snapshots older than this many days may be evicted for space
    #[arg(default_value_t = 30)]
    age_days: i64,

    /// Same-day snapshots older than this many days collapse to one
    #[arg(default_value_t = 7)]
    intraday_days: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The guard flushes buffered log lines when main returns
    let (state_dir, _guard) = logging::init();

    let _lock = match locks::RunLock::acquire(&state_dir, &cli.pool) {
        Ok(Some(lock)) => Some(lock),
        Ok(None) => {
            tracing::info!(pool = %cli.pool, "another run holds the pool lock, skipping");
            println!("{}", format!("Skipped: a run against '{}' is already active", cli.pool).yellow());
            return Ok(());
        }
        Err(err) => {
            tracing::warn!(pool = %cli.pool, %err, "could not take run lock, continuing unguarded");
            None
        }
    };

    let mut config = RunConfig::new(cli.pool.clone());
    config.min_free_gib = cli.min_free;
    config.age_days = cli.age_days;
    config.intraday_days = cli.intraday_days;

    let report = retention::run(Arc::new(ZfsEngine::new()), config).await;
    print_summary(&cli.pool, &report);

    // Degraded capacity is a warning, not a failure: the run did its work
    Ok(())
}

fn print_summary(pool: &str, report: &RunReport) {
    println!("{}", format!("Snapkeep run for '{pool}' complete").bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!(
        "Intraday snapshots collapsed: {}",
        report.consolidated.to_string().yellow()
    );
    println!(
        "Snapshots evicted for space:  {}",
        report.evicted.to_string().yellow()
    );
    println!(
        "Snapshots created:            {}",
        report.created.to_string().green()
    );
    if report.create_failures > 0 {
        println!(
            "Creation failures:            {}",
            report.create_failures.to_string().red()
        );
    }
    println!();
    match report.free_gib {
        Some(free) if report.floor_met => {
            println!("Free space: {}", format!("{free} GiB").green());
        }
        Some(free) => {
            println!(
                "Free space: {} {}",
                format!("{free} GiB").red(),
                "(below floor)".dimmed()
            );
        }
        None => println!("Free space: {}", "unknown".dimmed()),
    }
}
