//! Multi-threaded memory bandwidth benchmark with cache-aware sizing.
//!
//! ## Scope
//! Measures sustainable memory bandwidth with a parameterized elementwise
//! kernel over three large `f64` arrays. A kernel is described by how many
//! values it reads and writes per element; the STREAM set (copy, scale, add,
//! triad, read, write) plus a raw block copy are named instances.
//!
//! ## Key invariants
//! - The working set is sized from the detected L3 so that it cannot be
//!   served from cache (unless the operator forces a size).
//! - Worker `i` owns the same contiguous slice of every array for first
//!   touch and for every trial.
//! - Every trial ends at a barrier before its time is taken.
//! - Trial 0 is a warm-up and never reaches the statistics.
//! - Kernel results are observable (buffer writes or a returned witness), so
//!   the optimizer cannot drop the work being timed.
//!
//! ## Run flow
//! `discover -> decide_size -> WorkerPool -> WorkingSet -> measure (per kernel) -> report`
//!
//! ## Notable entry points
//! - [`topology::discover`] / [`topology::discover_with`]: layered cache probing.
//! - [`sizing::decide_size`]: the DRAM-escape sizing rule.
//! - [`kernel::run`]: one parallel pass of a workload.
//! - [`harness::measure`] / [`harness::measure_with`]: timed trial series.
//! - [`run::run`]: the whole benchmark as the binary runs it.

pub mod aligned;
pub mod config;
pub mod error;
pub mod harness;
pub mod kernel;
pub mod pattern;
pub mod pool;
pub mod report;
pub mod run;
pub mod rusage;
pub mod sizing;
pub mod sysinfo;
pub mod timer;
pub mod topology;
pub mod working_set;

pub use aligned::{AlignedBuffer, AllocError};
pub use config::{Cli, ConfigError, OutputFormat, RunConfig};
pub use error::BenchError;
pub use harness::{measure, measure_with, Measurement, Trial, TrialSeries, TrialSummary};
pub use pattern::{parse_selection, AccessPattern, KernelSpec, PatternError, Workload};
pub use pool::{static_partition, WorkerPool};
pub use sizing::{decide_size, Residency, SizeDecision, SizingError};
pub use topology::{CacheTopology, TopologyProbe};
pub use working_set::WorkingSet;
