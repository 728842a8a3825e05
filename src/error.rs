//! Top-level error for a benchmark run.

use std::io;

use thiserror::Error;

use crate::aligned::AllocError;
use crate::config::ConfigError;
use crate::harness::HarnessError;
use crate::pool::PoolError;
use crate::sizing::SizingError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sizing(#[from] SizingError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Harness(#[from] HarnessError),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}
