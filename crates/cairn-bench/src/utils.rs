//! Benchmark utilities and helpers.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cairn_common::config::{IndexConfig, SpaceConfig};
use cairn_common::types::{Field, FieldType, SpaceId, Tuple};

/// Space used by the load generator and benchmarks.
pub const BENCH_SPACE: SpaceId = SpaceId::new(0);

/// Returns the benchmark schema: a hash primary key on a number and a
/// non-unique tree index on a string.
pub fn bench_schema() -> Vec<SpaceConfig> {
    vec![SpaceConfig::new(BENCH_SPACE.as_u32(), IndexConfig::hash(0, FieldType::Num))
        .with_index(IndexConfig::tree(1, FieldType::Str).with_unique(false))]
}

/// Generates random string data for benchmarks.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Builds a benchmark tuple with the given key.
pub fn bench_tuple(rng: &mut StdRng, key: u64, value_size: usize) -> Tuple {
    Tuple::new(vec![
        Field::num(key),
        Field::str(&random_string(rng, 8)),
        Field::str(&random_string(rng, value_size)),
    ])
}

/// Generates `count` tuples with sequential keys.
pub fn generate_tuples(count: usize, value_size: usize) -> Vec<Tuple> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count as u64)
        .map(|key| bench_tuple(&mut rng, key, value_size))
        .collect()
}
