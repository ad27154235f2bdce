//! Concurrent load generator.
//!
//! Each worker thread issues a random mix of logged and unlogged mutations
//! and selects against a shared embedded database and records the outcome
//! of every request by error code.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use cairn_common::error::ErrorCode;
use cairn_common::types::{Field, UpdateOp};
use cairn_server::{Database, DatabaseResult};

use crate::utils::{bench_tuple, BENCH_SPACE};

/// Load generator settings.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Worker threads.
    pub threads: usize,
    /// Requests per worker.
    pub requests: usize,
    /// Size of the key space. Smaller means more conflicts.
    pub keys: u64,
    /// Bytes in the payload field.
    pub value_size: usize,
    /// Percentage of mutations sent unlogged.
    pub nolog_percent: u32,
    /// Percentage of requests that are selects.
    pub select_percent: u32,
    /// Base seed; worker `i` uses `seed + i`.
    pub seed: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            requests: 10_000,
            keys: 10_000,
            value_size: 32,
            nolog_percent: 10,
            select_percent: 30,
            seed: 42,
        }
    }
}

/// Outcome of a load run.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Requests issued.
    pub total: u64,
    /// Requests that succeeded.
    pub success: u64,
    /// Failed requests by error code.
    pub errors: BTreeMap<ErrorCode, u64>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl LoadReport {
    fn record<T>(&mut self, result: DatabaseResult<T>) {
        self.total += 1;
        match result {
            Ok(_) => self.success += 1,
            Err(e) => *self.errors.entry(e.code()).or_default() += 1,
        }
    }

    fn merge(&mut self, other: LoadReport) {
        self.total += other.total;
        self.success += other.success;
        for (code, n) in other.errors {
            *self.errors.entry(code).or_default() += n;
        }
    }

    /// Requests per second over the run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}/{} succeeded in {:.3}s ({:.0} req/s)",
            self.success,
            self.total,
            self.elapsed.as_secs_f64(),
            self.throughput()
        )?;
        for (code, n) in &self.errors {
            writeln!(f, "  {:<16} {:#06x} {:>10}", format!("{code:?}"), code.as_u16(), n)?;
        }
        Ok(())
    }
}

/// Runs the workload against `db` and waits for every worker.
pub fn run_load(db: &Arc<Database>, options: &LoadOptions) -> LoadReport {
    let started = Instant::now();
    let handles: Vec<_> = (0..options.threads)
        .map(|worker| {
            let db = Arc::clone(db);
            let options = options.clone();
            thread::Builder::new()
                .name(format!("bench-{worker}"))
                .spawn(move || run_worker(&db, &options, worker as u64))
        })
        .collect();

    let mut report = LoadReport::default();
    for handle in handles {
        match handle.map(|h| h.join()) {
            Ok(Ok(worker_report)) => report.merge(worker_report),
            _ => *report.errors.entry(ErrorCode::Internal).or_default() += 1,
        }
    }
    report.elapsed = started.elapsed();
    report
}

fn run_worker(db: &Database, options: &LoadOptions, worker: u64) -> LoadReport {
    let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(worker));
    let mut report = LoadReport::default();
    let keys = options.keys.max(1);

    for _ in 0..options.requests {
        let key = rng.gen_range(0..keys);
        if rng.gen_range(0..100) < options.select_percent {
            report.record(db.select(BENCH_SPACE, 0, &[vec![Field::num(key)]]));
            continue;
        }
        if rng.gen_range(0..100) < options.nolog_percent {
            let tuple = bench_tuple(&mut rng, key, options.value_size);
            report.record(db.insert_nolog(BENCH_SPACE, tuple));
            continue;
        }
        match rng.gen_range(0..4) {
            0 => {
                let tuple = bench_tuple(&mut rng, key, options.value_size);
                report.record(db.insert(BENCH_SPACE, tuple));
            }
            1 => {
                let tuple = bench_tuple(&mut rng, key, options.value_size);
                report.record(db.upsert(BENCH_SPACE, tuple));
            }
            2 => {
                let op = UpdateOp::splice(1, 0, 1, "u");
                report.record(db.update_fields(BENCH_SPACE, vec![Field::num(key)], vec![op]));
            }
            _ => report.record(db.delete(BENCH_SPACE, vec![Field::num(key)])),
        }
    }

    debug!(worker, total = report.total, success = report.success, "worker done");
    report
}
