use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatmulError {
    #[error("failed to allocate {bytes} bytes of cache-aligned storage")]
    Allocation { bytes: usize },
    #[error("failed to spawn worker thread {worker}: {source}")]
    ThreadSpawn {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker thread {worker} panicked")]
    WorkerPanicked { worker: usize },
    #[error("invalid matrix dimension {0}: must be at least 1")]
    InvalidDimension(usize),
    #[error("dimension mismatch: expected {expected}x{expected}, got {got}x{got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("expected {expected} elements, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("task source produced an invalid task: {0}")]
    InvalidTask(String),
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, MatmulError>;
