//! Command-line parsing and validation.
//!
//! [`Cli`] is the raw clap parse. Numeric arguments are taken as `i64` so that
//! out-of-range values (`0`, `-3`, `1025`) reach [`RunConfig::from_cli`] and
//! get the same messages as every other range error, instead of clap's
//! generic "invalid value".

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::harness::DEFAULT_TRIALS;
use crate::pattern::{parse_selection, KernelSpec, PatternError};
use crate::pool::MAX_THREADS;
use crate::sizing::validate_array_mib;

/// Upper bound on `--trials`.
pub const MAX_TRIALS: usize = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("num_threads must be between 1 and 1024 (got {0})")]
    ThreadCount(i64),
    #[error("trials must be between 2 and 100000 (got {0})")]
    Trials(i64),
    #[error("array_size_mb must be between 1 and 65536 (got {0})")]
    ArraySize(i64),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Banners and a results table.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ultramem",
    version,
    about = "Multi-threaded memory bandwidth benchmark",
    after_help = "Examples:\n  ultramem 8 1:1            # 8 threads, copy-like pattern, auto array size\n  ultramem 32 2:1 256       # 32 threads, triad-like pattern, 256 MB arrays\n  ultramem 16 stream        # full STREAM suite"
)]
pub struct Cli {
    /// Number of worker threads (1-1024).
    #[arg(allow_negative_numbers = true)]
    pub num_threads: i64,

    /// `reads:writes` (each 0-100, not both 0), a kernel name
    /// (copy, scale, add, triad, read, write, memcpy), or `stream`.
    #[arg(value_name = "READS:WRITES|KERNEL")]
    pub pattern: String,

    /// Size of each array in MB (default: 4x L3 across 3 arrays, at least 128).
    #[arg(allow_negative_numbers = true)]
    pub array_size_mb: Option<i64>,

    /// Timed repetitions per kernel; the first is a discarded warm-up.
    #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_TRIALS as i64)]
    pub trials: i64,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Validated run parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub threads: usize,
    pub kernels: Vec<KernelSpec>,
    pub array_mib: Option<u64>,
    pub trials: usize,
    pub format: OutputFormat,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let threads = usize::try_from(cli.num_threads)
            .ok()
            .filter(|t| (1..=MAX_THREADS).contains(t))
            .ok_or(ConfigError::ThreadCount(cli.num_threads))?;

        let kernels = parse_selection(&cli.pattern)?;

        let array_mib = cli
            .array_size_mb
            .map(|mib| {
                u64::try_from(mib)
                    .ok()
                    .and_then(|m| validate_array_mib(m).ok())
                    .ok_or(ConfigError::ArraySize(mib))
            })
            .transpose()?;

        let trials = usize::try_from(cli.trials)
            .ok()
            .filter(|t| (2..=MAX_TRIALS).contains(t))
            .ok_or(ConfigError::Trials(cli.trials))?;

        Ok(Self {
            threads,
            kernels,
            array_mib,
            trials,
            format: cli.format,
        })
    }
}
