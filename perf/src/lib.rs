//! Shared helpers for the avbus benchmarks.

use avbus_ring::ShareName;

/// A collision-free share name for a benchmark run.
pub fn bench_share_name(tag: &str) -> ShareName {
    ShareName::from(format!("avbus_bench_{tag}_{}", std::process::id()))
}
