//! Property-based tests for kernels, partitioning, sizing and trial statistics.
//!
//! Run with: `cargo test --test property`

mod kernel_laws;
mod partition;
mod sizing;
mod trial_stats;
