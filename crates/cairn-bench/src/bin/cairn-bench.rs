//! Cairn Load Generator
//!
//! The `cairn-bench` binary opens an embedded database and hammers it from
//! several threads with a mix of logged mutations, unlogged inserts, and
//! selects, then prints a success count and an error code histogram.
//!
//! # Usage
//!
//! ```bash
//! # In-memory log, default mix
//! cairn-bench
//!
//! # File-backed log with fsync per record
//! cairn-bench --data-dir /tmp/cairn --sync full
//!
//! # Stall the writer for 200ms halfway through
//! cairn-bench --stall-ms 200
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cairn_bench::load::{run_load, LoadOptions};
use cairn_bench::utils::bench_schema;
use cairn_server::config::{ServerConfig, WalSyncMode};
use cairn_server::Database;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SyncArg {
    None,
    Normal,
    Full,
}

impl From<SyncArg> for WalSyncMode {
    fn from(sync: SyncArg) -> Self {
        match sync {
            SyncArg::None => WalSyncMode::None,
            SyncArg::Normal => WalSyncMode::Normal,
            SyncArg::Full => WalSyncMode::Full,
        }
    }
}

/// Cairn load generator
#[derive(Parser, Debug)]
#[command(
    name = "cairn-bench",
    author = "Cairn Team",
    version,
    about = "Concurrent load generator for Cairn"
)]
struct Args {
    /// Number of worker threads
    #[arg(short = 't', long, default_value_t = 4, env = "CAIRN_BENCH_THREADS")]
    threads: usize,

    /// Requests per worker
    #[arg(short = 'n', long, default_value_t = 10_000, env = "CAIRN_BENCH_REQUESTS")]
    requests: usize,

    /// Size of the key space
    #[arg(short = 'k', long, default_value_t = 10_000)]
    keys: u64,

    /// Payload bytes per tuple
    #[arg(long, default_value_t = 32)]
    value_size: usize,

    /// Percentage of mutations sent unlogged
    #[arg(long, default_value_t = 10)]
    nolog_percent: u32,

    /// Percentage of requests that are selects
    #[arg(long, default_value_t = 30)]
    select_percent: u32,

    /// Stall the WAL writer for this many milliseconds during the run
    #[arg(long)]
    stall_ms: Option<u64>,

    /// Data directory for a file-backed log (in-memory if omitted)
    #[arg(short = 'd', long, value_name = "DIR", env = "CAIRN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// WAL sync mode
    #[arg(long, value_enum, default_value = "normal")]
    sync: SyncArg,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "CAIRN_LOG_LEVEL")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = load_config(&args)?;
    let db = Arc::new(Database::open(&config).context("Failed to open database")?);
    info!(
        threads = args.threads,
        requests = args.requests,
        keys = args.keys,
        "starting load"
    );

    let options = LoadOptions {
        threads: args.threads,
        requests: args.requests,
        keys: args.keys,
        value_size: args.value_size,
        nolog_percent: args.nolog_percent,
        select_percent: args.select_percent,
        seed: args.seed,
    };

    let staller = args.stall_ms.map(|ms| {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms / 2 + 1));
            db.pause_wal();
            thread::sleep(Duration::from_millis(ms));
            db.resume_wal();
        })
    });

    let report = run_load(&db, &options);
    if let Some(handle) = staller {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("stall thread panicked"))?;
    }
    db.close();

    print!("{report}");
    let stats = db.writer_stats();
    println!(
        "wal: {} records, {} batches (max {}), {} syncs",
        stats.records_written.load(Ordering::Relaxed),
        stats.batches.load(Ordering::Relaxed),
        stats.max_batch.load(Ordering::Relaxed),
        stats.syncs.load(Ordering::Relaxed),
    );
    Ok(())
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_new(format!(
        "cairn_bench={level},cairn_server={level},cairn_storage={level},cairn_wal={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = if let Some(path) = &args.config {
        ServerConfig::from_file(path).context("Failed to load config file")?
    } else {
        ServerConfig::default()
    };

    match &args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("Failed to create data directory")?;
            config.data_dir = dir.clone();
            config.wal.memory = false;
        }
        None if args.config.is_none() => config.wal.memory = true,
        None => {}
    }
    config.wal.sync_mode = args.sync.into();
    if config.object_space.is_empty() {
        config.object_space = bench_schema();
    }
    Ok(config)
}
