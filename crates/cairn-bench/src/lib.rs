//! Cairn Performance Benchmarks
//!
//! This crate contains the `cairn-bench` load generator and criterion
//! benchmarks for the mutation pipeline and the storage layer.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p cairn-bench
//! ```
//!
//! Run the load generator with:
//! ```bash
//! cargo run -p cairn-bench --release -- --threads 8 --requests 100000
//! ```

pub mod load;
pub mod utils;
