use parmatmul::threaded::Task;
use parmatmul::threaded::static_partition::{static_partition, static_partition_with_block};
use parmatmul::threaded::task_queue::{TaskQueue, TaskSource, multiply_with_source};
use parmatmul::{Granularity, Matrix, MatmulError, multiply_serial, verify};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;

fn assert_exact_cover(ranges: &[std::ops::Range<usize>], n: usize) {
    let mut next = 0;
    for r in ranges {
        assert_eq!(r.start, next, "gap or overlap at {:?} in {:?}", r, ranges);
        assert!(r.end > r.start, "empty band in {:?}", ranges);
        next = r.end;
    }
    assert_eq!(next, n, "{:?} doesn't end at {}", ranges, n);
}

// ============================================================
// Static partition
// ============================================================

proptest! {
    #[test]
    fn static_partition_covers_rows(n in 1usize..2000, threads in 1usize..64) {
        let ranges = static_partition(n, threads);
        assert_exact_cover(&ranges, n);
        prop_assert!(ranges.len() <= 4);
    }

    #[test]
    fn static_partition_with_small_blocks(
        n in 1usize..300,
        threads in 1usize..8,
        block in 1usize..40,
    ) {
        let ranges = static_partition_with_block(n, threads, block);
        assert_exact_cover(&ranges, n);
        for r in &ranges[..ranges.len() - 1] {
            prop_assert_eq!(r.start % block, 0);
            prop_assert_eq!(r.len() % block, 0);
        }
    }
}

#[test]
fn test_every_thread_count_up_to_n() {
    for n in [1, 5, 64, 127, 128, 129, 300, 513] {
        for threads in 1..=n.min(40) {
            assert_exact_cover(&static_partition_with_block(n, threads, 4), n);
            assert_exact_cover(&static_partition(n, threads), n);
        }
    }
}

// ============================================================
// Dynamic task queue
// ============================================================

proptest! {
    #[test]
    fn queue_emits_each_task_once(n in 1usize..40, cell in any::<bool>()) {
        let granularity = if cell { Granularity::Cell } else { Granularity::Row };
        let queue = TaskQueue::new(n, granularity);

        let ids: Vec<usize> = std::iter::from_fn(|| queue.acquire_task())
            .map(|t| t.index(n))
            .collect();

        prop_assert_eq!(ids.len(), queue.total_tasks());
        prop_assert_eq!(ids, (0..granularity.total_tasks(n)).collect::<Vec<_>>());
        prop_assert!(queue.acquire_task().is_none());
    }
}

#[test]
fn test_concurrent_drain_no_duplicates() {
    let n = 60;
    let queue = TaskQueue::new(n, Granularity::Cell);

    let per_thread: Vec<Vec<usize>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    std::iter::from_fn(|| queue.acquire_task())
                        .map(|t| t.index(n))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let total: usize = per_thread.iter().map(Vec::len).sum();
    let distinct: HashSet<usize> = per_thread.into_iter().flatten().collect();

    assert_eq!(total, n * n);
    assert_eq!(distinct.len(), n * n);
    assert!(distinct.iter().all(|&id| id < n * n));
}

/// Wraps a queue and records every task it hands out.
struct Recording {
    inner: TaskQueue,
    seen: Mutex<Vec<Task>>,
}

// SAFETY: forwards to TaskQueue, which never repeats a task.
unsafe impl TaskSource for Recording {
    fn acquire_task(&self) -> Option<Task> {
        let task = self.inner.acquire_task()?;
        self.seen.lock().unwrap().push(task);
        Some(task)
    }

    fn total_tasks(&self) -> usize {
        self.inner.total_tasks()
    }

    fn granularity(&self) -> Granularity {
        self.inner.granularity()
    }
}

#[test]
fn test_injected_source_sees_every_task() {
    let n = 23;
    let b = Matrix::from_fn(n, |i, j| ((i + 2 * j) % 9) as f32).unwrap();
    let c = Matrix::from_fn(n, |i, j| ((3 * i + j) % 5) as f32).unwrap();
    let mut expected = Matrix::zeroed(n).unwrap();
    multiply_serial(&mut expected, &b, &c).unwrap();

    for granularity in [Granularity::Row, Granularity::Cell] {
        let source = Recording {
            inner: TaskQueue::new(n, granularity),
            seen: Mutex::new(Vec::new()),
        };
        let mut a = Matrix::zeroed(n).unwrap();

        let threads = multiply_with_source(&mut a, &b, &c, 4, &source).unwrap();

        let seen = source.seen.into_inner().unwrap();
        let ids: HashSet<usize> = seen.iter().map(|t| t.index(n)).collect();
        assert_eq!(threads, 4);
        assert_eq!(seen.len(), granularity.total_tasks(n));
        assert_eq!(ids.len(), seen.len());
        assert!(verify(&expected, &a, 0.0).unwrap().passed);
    }
}

/// Hands out only the first `limit` rows.
struct Truncated {
    inner: TaskQueue,
    limit: usize,
}

// SAFETY: a prefix of TaskQueue's sequence, still no repeats.
unsafe impl TaskSource for Truncated {
    fn acquire_task(&self) -> Option<Task> {
        match self.inner.acquire_task()? {
            Task::Row { row } if row < self.limit => Some(Task::Row { row }),
            _ => None,
        }
    }

    fn total_tasks(&self) -> usize {
        self.limit
    }

    fn granularity(&self) -> Granularity {
        Granularity::Row
    }
}

#[test]
fn test_rows_never_handed_out_are_untouched() {
    let n = 8;
    let b = Matrix::identity(n).unwrap();
    let c = Matrix::from_fn(n, |i, j| (i * n + j) as f32).unwrap();
    let source = Truncated {
        inner: TaskQueue::new(n, Granularity::Row),
        limit: 5,
    };
    let mut a = Matrix::from_fn(n, |_, _| -1.0).unwrap();

    multiply_with_source(&mut a, &b, &c, 3, &source).unwrap();

    for i in 0..n {
        let want = if i < 5 { c.row(i) } else { &[-1.0; 8][..] };
        assert_eq!(a.row(i), want, "row {}", i);
    }
}

/// Replays a fixed list of tasks, one per call, claiming `granularity`.
struct Scripted {
    tasks: Mutex<Vec<Task>>,
    granularity: Granularity,
}

impl Scripted {
    fn new(granularity: Granularity, mut tasks: Vec<Task>) -> Self {
        tasks.reverse();
        Self {
            tasks: Mutex::new(tasks),
            granularity,
        }
    }
}

// SAFETY: never repeats a task; workers reject the shape and bounds
// violations these scripts contain before writing.
unsafe impl TaskSource for Scripted {
    fn acquire_task(&self) -> Option<Task> {
        self.tasks.lock().unwrap().pop()
    }

    fn total_tasks(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    fn granularity(&self) -> Granularity {
        self.granularity
    }
}

#[test]
fn test_mixed_row_and_cell_tasks_rejected() {
    let n = 4;
    let b = Matrix::identity(n).unwrap();
    let c = Matrix::from_fn(n, |i, j| (i * n + j) as f32).unwrap();
    // A row and a cell over the same element would be two writers
    let source = Scripted::new(
        Granularity::Row,
        vec![Task::Row { row: 0 }, Task::Cell { row: 0, col: 0 }],
    );
    let mut a = Matrix::zeroed(n).unwrap();

    let err = multiply_with_source(&mut a, &b, &c, 1, &source).unwrap_err();

    assert!(matches!(err, MatmulError::InvalidTask(_)), "{:?}", err);
    assert_eq!(a.row(0), c.row(0));
    assert_eq!(a.get(1, 0), 0.0);
}

#[test]
fn test_out_of_bounds_tasks_rejected() {
    let n = 3;
    let b = Matrix::identity(n).unwrap();
    let c = Matrix::identity(n).unwrap();

    for (granularity, task) in [
        (Granularity::Row, Task::Row { row: 3 }),
        (Granularity::Cell, Task::Cell { row: 0, col: 3 }),
        (Granularity::Cell, Task::Cell { row: 3, col: 0 }),
    ] {
        let source = Scripted::new(granularity, vec![task]);
        let mut a = Matrix::from_fn(n, |_, _| 7.0).unwrap();

        let err = multiply_with_source(&mut a, &b, &c, 2, &source).unwrap_err();

        assert!(matches!(err, MatmulError::InvalidTask(_)), "{:?}", err);
        assert!(a.as_slice().iter().all(|&x| x == 7.0), "{:?} wrote output", task);
    }
}
