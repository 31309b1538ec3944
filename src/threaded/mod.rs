//! Multi-threaded products.
//!
//! Both strategies spawn a fresh set of scoped OS threads per call and join
//! every one of them before returning, so no worker outlives the matrices it
//! borrows.
//!
//! Available strategies:
//! - `static_partition`: contiguous tile-aligned row bands, tiled kernel
//! - `task_queue`: rows or cells pulled from a shared locked counter

pub mod static_partition;
pub mod task_queue;

use crate::blocked::tiled::BLOCK_SIZE;
use crate::error::{MatmulError, Result};
use crate::matrix::Matrix;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

pub use static_partition::{MAX_STATIC_THREADS, static_partition, static_thread_count};
pub use task_queue::{Granularity, Task, TaskQueue, TaskSource, dynamic_thread_count};

/// Upper bound on dynamic workers regardless of the request.
pub const MAX_THREADS_CAP: usize = 64;

/// How output work is spread across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Static,
    Dynamic(Granularity),
}

impl Strategy {
    /// Thread count a run with `requested` threads on an n×n problem will
    /// use (upper bound for static, where empty bands are dropped).
    pub fn effective_threads(self, n: usize, requested: usize) -> usize {
        match self {
            Strategy::Static => static_thread_count(n, requested, BLOCK_SIZE),
            Strategy::Dynamic(_) => dynamic_thread_count(n, requested),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Static => f.write_str("static"),
            Strategy::Dynamic(g) => write!(f, "dynamic-{}", g),
        }
    }
}

/// Outcome of one parallel product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallelRun {
    pub elapsed: Duration,
    pub threads: usize,
}

/// Per-worker inputs: identity, assigned work and read-only matrix views.
pub(crate) struct WorkerDescriptor<'a, W> {
    pub(crate) id: usize,
    pub(crate) n: usize,
    pub(crate) b: &'a [f32],
    pub(crate) c: &'a [f32],
    pub(crate) work: W,
}

/// Overwrites `a` with `b · c` using `threads` workers and `strategy`.
///
/// # Errors
///
/// `DimensionMismatch` if the matrices differ in size; `Allocation`,
/// `ThreadSpawn` or `WorkerPanicked` if any worker fails. On error the
/// contents of `a` are unspecified.
pub fn multiply_parallel(
    a: &mut Matrix,
    b: &Matrix,
    c: &Matrix,
    threads: usize,
    strategy: Strategy,
) -> Result<ParallelRun> {
    let start = Instant::now();
    let threads = match strategy {
        Strategy::Static => static_partition::multiply_static(a, b, c, threads, BLOCK_SIZE)?,
        Strategy::Dynamic(granularity) => {
            task_queue::multiply_dynamic(a, b, c, threads, granularity)?
        }
    };
    Ok(ParallelRun {
        elapsed: start.elapsed(),
        threads,
    })
}

/// Spawns one named scoped thread per descriptor and joins them all.
///
/// A spawn failure stops further spawning; already running workers are
/// still joined before the error is returned. The first failure wins.
pub(crate) fn run_workers<'a, W, F>(
    descriptors: Vec<WorkerDescriptor<'a, W>>,
    work: F,
) -> Result<()>
where
    W: Send + 'a,
    F: Fn(WorkerDescriptor<'a, W>) -> Result<()> + Sync,
{
    let work = &work;

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(descriptors.len());
        let mut spawn_error = None;

        for desc in descriptors {
            let id = desc.id;
            let spawned = thread::Builder::new()
                .name(format!("matmul-worker-{}", id))
                .spawn_scoped(s, move || work(desc));
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(source) => {
                    spawn_error = Some(MatmulError::ThreadSpawn { worker: id, source });
                    break;
                }
            }
        }

        let mut result = Ok(());
        for (id, handle) in handles {
            let outcome = handle
                .join()
                .unwrap_or(Err(MatmulError::WorkerPanicked { worker: id }));
            if result.is_ok() {
                result = outcome;
            }
        }

        match spawn_error {
            Some(err) => Err(err),
            None => result,
        }
    })
}
