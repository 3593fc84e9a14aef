//! Error types for enumeration and the worker pool.
//!
//! Per-file conversion failures are not represented here: they are recovered
//! inside the worker (fall back to a raw copy, then record the task as
//! failed) and surface in the run summary instead of as errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised before any worker is spawned.
#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("input directory does not exist: {0}")]
    InputMissing(PathBuf),

    #[error("input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors from the worker pool lifecycle.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    #[error("worker {id} panicked")]
    Panicked { id: usize },
}

/// Top-level error for a full pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Enumerate(#[from] EnumerateError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}
