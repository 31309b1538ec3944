//! Dynamic work distribution through a shared, lock-guarded task counter.
//!
//! Threads pull one row (or one cell) at a time from a [`TaskSource`],
//! compute it with a plain inner product and come back for more until the
//! source runs dry. No tiling here: a single row is already finer than a
//! tile, so this trades cache reuse for load balancing.

use super::{MAX_THREADS_CAP, WorkerDescriptor, run_workers};
use crate::error::{MatmulError, Result};
use crate::matrix::Matrix;
use crate::matrix::naive::{dot_cell, dot_row};
use log::{debug, trace};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::{Mutex, PoisonError};

/// What a single task covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One output row per task, `n` tasks total.
    Row,
    /// One output element per task, `n * n` tasks total.
    Cell,
}

impl Granularity {
    pub fn total_tasks(self, n: usize) -> usize {
        match self {
            Self::Row => n,
            Self::Cell => n * n,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Cell => f.write_str("cell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Row { row: usize },
    Cell { row: usize, col: usize },
}

impl Task {
    /// Translates a counter value into a coordinate of an n×n output.
    pub fn from_index(index: usize, n: usize, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Row => Task::Row { row: index },
            Granularity::Cell => Task::Cell {
                row: index / n,
                col: index % n,
            },
        }
    }

    /// Inverse of [`Task::from_index`].
    pub fn index(self, n: usize) -> usize {
        match self {
            Task::Row { row } => row,
            Task::Cell { row, col } => row * n + col,
        }
    }

    pub fn granularity(self) -> Granularity {
        match self {
            Task::Row { .. } => Granularity::Row,
            Task::Cell { .. } => Granularity::Cell,
        }
    }

    /// True when every coordinate fits an n×n output.
    pub fn in_bounds(self, n: usize) -> bool {
        match self {
            Task::Row { row } => row < n,
            Task::Cell { row, col } => row < n && col < n,
        }
    }

    /// Output elements this task writes, as a flat range.
    fn span(self, n: usize) -> Range<usize> {
        match self {
            Task::Row { row } => row * n..(row + 1) * n,
            Task::Cell { row, col } => {
                let idx = row * n + col;
                idx..idx + 1
            }
        }
    }
}

/// Hands out tasks to worker threads.
///
/// # Safety
///
/// Workers write a task's output span without further synchronization, so
/// implementors must guarantee that the spans of all tasks returned over the
/// lifetime of the source are pairwise disjoint, including across threads.
/// In particular:
///
/// - no task is returned twice;
/// - every task has the source's [`granularity`](TaskSource::granularity),
///   so a `Row` and a `Cell` of the same row never both come out;
/// - every coordinate is below the dimension of the output being filled.
///
/// Workers reject tasks that break the last two rules before writing
/// anything, but duplicates can't be detected cheaply.
pub unsafe trait TaskSource: Sync {
    /// Next task, or `None` once everything has been handed out.
    fn acquire_task(&self) -> Option<Task>;

    fn total_tasks(&self) -> usize;

    /// Shape shared by every task this source returns.
    fn granularity(&self) -> Granularity;
}

/// Mutex-guarded monotonically increasing counter over `[0, total_tasks)`.
#[derive(Debug)]
pub struct TaskQueue {
    n: usize,
    granularity: Granularity,
    total_tasks: usize,
    next_task: Mutex<usize>,
}

impl TaskQueue {
    pub fn new(n: usize, granularity: Granularity) -> Self {
        Self {
            n,
            granularity,
            total_tasks: granularity.total_tasks(n),
            next_task: Mutex::new(0),
        }
    }

    /// Number of tasks handed out so far.
    pub fn issued(&self) -> usize {
        *self.next_task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_exhausted(&self) -> bool {
        self.issued() >= self.total_tasks
    }
}

// SAFETY: the counter is read and bumped under one lock and never moves
// backwards, so each index in [0, total_tasks) comes out exactly once.
unsafe impl TaskSource for TaskQueue {
    fn acquire_task(&self) -> Option<Task> {
        let index = {
            // A poisoned counter is still a valid counter.
            let mut next = self.next_task.lock().unwrap_or_else(PoisonError::into_inner);
            if *next >= self.total_tasks {
                return None;
            }
            let index = *next;
            *next += 1;
            index
        };
        Some(Task::from_index(index, self.n, self.granularity))
    }

    fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    fn granularity(&self) -> Granularity {
        self.granularity
    }
}

/// Output matrix shared across dynamic workers.
///
/// Wraps the raw pointer so threads can write the disjoint spans the task
/// source assigns them.
pub(crate) struct SharedOutput<'a> {
    ptr: *mut f32,
    len: usize,
    _marker: PhantomData<&'a mut [f32]>,
}

unsafe impl Send for SharedOutput<'_> {}
unsafe impl Sync for SharedOutput<'_> {}

impl<'a> SharedOutput<'a> {
    pub(crate) fn new(out: &'a mut [f32]) -> Self {
        Self {
            ptr: out.as_mut_ptr(),
            len: out.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// No other live reference may overlap `range` while the returned slice
    /// is in use.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn span_mut(&self, range: Range<usize>) -> &mut [f32] {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "span {:?} out of bounds for output of {}",
            range,
            self.len
        );
        // SAFETY: in bounds (checked above), exclusivity is on the caller.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.len()) }
    }
}

/// Clamps a requested thread count to `[1, min(n, MAX_THREADS_CAP)]`.
pub fn dynamic_thread_count(n: usize, requested: usize) -> usize {
    requested.clamp(1, n.min(MAX_THREADS_CAP).max(1))
}

pub(crate) struct QueueWork<'a, Q: ?Sized> {
    queue: &'a Q,
    out: &'a SharedOutput<'a>,
}

/// Dynamic task-queue product: overwrites `a` with `b · c`.
///
/// Returns the number of worker threads used.
pub fn multiply_dynamic(
    a: &mut Matrix,
    b: &Matrix,
    c: &Matrix,
    requested: usize,
    granularity: Granularity,
) -> Result<usize> {
    let queue = TaskQueue::new(a.n(), granularity);
    multiply_with_source(a, b, c, requested, &queue)
}

/// Runs the dynamic strategy against any [`TaskSource`].
///
/// Every output element the source never hands out is left untouched.
pub fn multiply_with_source<Q: TaskSource + ?Sized>(
    a: &mut Matrix,
    b: &Matrix,
    c: &Matrix,
    requested: usize,
    queue: &Q,
) -> Result<usize> {
    a.check_same_size(b)?;
    a.check_same_size(c)?;

    let n = a.n();
    let threads = dynamic_thread_count(n, requested);
    debug!(
        "dynamic: n={}, {} tasks across {} threads",
        n,
        queue.total_tasks(),
        threads
    );

    let (b, c) = (b.as_slice(), c.as_slice());
    let out = SharedOutput::new(a.as_mut_slice());

    let descriptors = (0..threads)
        .map(|id| WorkerDescriptor {
            id,
            n,
            b,
            c,
            work: QueueWork { queue, out: &out },
        })
        .collect();

    run_workers(descriptors, |desc| {
        let completed = drain(&desc)?;
        debug!("worker {} completed {} tasks", desc.id, completed);
        Ok(())
    })?;

    Ok(threads)
}

fn drain<Q: TaskSource + ?Sized>(
    desc: &WorkerDescriptor<'_, QueueWork<'_, Q>>,
) -> Result<usize> {
    let WorkerDescriptor { id, n, b, c, .. } = *desc;
    let granularity = desc.work.queue.granularity();
    let mut completed = 0;

    while let Some(task) = desc.work.queue.acquire_task() {
        if task.granularity() != granularity || !task.in_bounds(n) {
            return Err(MatmulError::InvalidTask(format!(
                "{:?} from a {} source for a {}x{} output",
                task, granularity, n, n
            )));
        }
        // SAFETY: same granularity, in bounds and never repeated, so this
        // span overlaps no other worker's.
        let dst = unsafe { desc.work.out.span_mut(task.span(n)) };
        match task {
            Task::Row { row } => dot_row(b, c, n, row, dst),
            Task::Cell { row, col } => dst[0] = dot_cell(b, c, n, row, col),
        }
        trace!("worker {} done with {:?}", id, task);
        completed += 1;
    }

    Ok(completed)
}
