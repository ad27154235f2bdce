//! Shared fixtures for the scenario tests.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cairn_common::config::{IndexConfig, SpaceConfig};
use cairn_common::types::{FieldType, SpaceId, Tuple};
use cairn_server::Database;

/// Space every fixture schema defines.
pub const SPACE: SpaceId = SpaceId::new(0);

/// How long helpers wait for a condition before failing the test.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// `[NUM id, STR value]` with a hash primary key on the id.
pub fn box_schema() -> Vec<SpaceConfig> {
    vec![SpaceConfig::new(SPACE.as_u32(), IndexConfig::hash(0, FieldType::Num))]
}

/// Single-field string tuples with a unique tree primary key.
pub fn tree_str_schema() -> Vec<SpaceConfig> {
    vec![SpaceConfig::new(SPACE.as_u32(), IndexConfig::tree(0, FieldType::Str))]
}

/// Opens an in-memory database shared between threads.
pub fn memory_db(schema: &[SpaceConfig]) -> Arc<Database> {
    Arc::new(Database::open_memory(schema).expect("Failed to open database"))
}

/// Polls `cond` until it holds, panicking after [`WAIT_TIMEOUT`].
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Waits until `n` records sit in the writer queue.
pub fn wait_for_queued(db: &Database, n: usize) {
    wait_until(&format!("{n} queued WAL records"), || db.wal_queued() >= n);
}

/// Renders tuples the way the console prints them.
pub fn render<'a>(tuples: impl IntoIterator<Item = &'a Arc<Tuple>>) -> Vec<String> {
    tuples.into_iter().map(|t| t.to_string()).collect()
}
