//! Static row partition: contiguous, tile-aligned row bands, one per thread.

use super::{WorkerDescriptor, run_workers};
use crate::blocked::tiled::{BLOCK_SIZE, multiply_region_with_block};
use crate::error::Result;
use crate::matrix::Matrix;
use log::{debug, trace};
use std::ops::Range;

/// Hard cap on static workers.
pub const MAX_STATIC_THREADS: usize = 4;

/// Clamps a requested thread count to `[1, min(ceil(n / block), 4)]`.
pub fn static_thread_count(n: usize, requested: usize, block: usize) -> usize {
    let upper = n.div_ceil(block).min(MAX_STATIC_THREADS).max(1);
    requested.clamp(1, upper)
}

/// Row bands for `n` rows using [`BLOCK_SIZE`] alignment.
///
/// ```
/// use parmatmul::threaded::static_partition::static_partition;
///
/// assert_eq!(static_partition(300, 3), vec![0..128, 128..256, 256..300]);
/// assert_eq!(static_partition(4, 10), vec![0..4]);
/// ```
pub fn static_partition(n: usize, requested: usize) -> Vec<Range<usize>> {
    static_partition_with_block(n, requested, BLOCK_SIZE)
}

/// Splits `[0, n)` into contiguous bands whose size is `ceil(n / T)` rounded
/// up to a multiple of `block`.
///
/// The last band ends at `n`. Rounding up can leave trailing threads with
/// nothing; those empty bands are dropped, so the result may be shorter
/// than the clamped thread count. Bands never overlap and their union is
/// exactly `[0, n)`.
pub fn static_partition_with_block(n: usize, requested: usize, block: usize) -> Vec<Range<usize>> {
    assert!(block > 0, "tile side must be non-zero");
    if n == 0 {
        return Vec::new();
    }

    let threads = static_thread_count(n, requested, block);
    let chunk = n.div_ceil(threads).div_ceil(block) * block;

    (0..threads)
        .map(|t| {
            let start = (t * chunk).min(n);
            let end = if t == threads - 1 {
                n
            } else {
                ((t + 1) * chunk).min(n)
            };
            start..end
        })
        .filter(|rows| !rows.is_empty())
        .collect()
}

pub(crate) struct RowBand<'a> {
    rows: Range<usize>,
    band: &'a mut [f32],
}

/// Static-partition product: overwrites `a` with `b · c`.
///
/// Each worker zeroes its own band and runs the tiled kernel over it. The
/// bands are split off `a` with `split_at_mut`, so no two workers can touch
/// the same row and no locking is needed.
///
/// Returns the number of worker threads used.
pub fn multiply_static(
    a: &mut Matrix,
    b: &Matrix,
    c: &Matrix,
    requested: usize,
    block: usize,
) -> Result<usize> {
    a.check_same_size(b)?;
    a.check_same_size(c)?;

    let n = a.n();
    let ranges = static_partition_with_block(n, requested, block);
    let threads = ranges.len();
    debug!("static: n={}, block={}, bands={:?}", n, block, ranges);

    let (b, c) = (b.as_slice(), c.as_slice());
    let mut rest = a.as_mut_slice();
    let mut descriptors = Vec::with_capacity(threads);

    for (id, rows) in ranges.into_iter().enumerate() {
        let (band, tail) = std::mem::take(&mut rest).split_at_mut(rows.len() * n);
        rest = tail;
        descriptors.push(WorkerDescriptor {
            id,
            n,
            b,
            c,
            work: RowBand { rows, band },
        });
    }

    run_workers(descriptors, |desc| {
        let RowBand { rows, band } = desc.work;
        band.fill(0.0);
        multiply_region_with_block(block, band, desc.b, desc.c, desc.n, rows.clone())?;
        trace!("worker {} done with rows {:?}", desc.id, rows);
        Ok(())
    })?;

    Ok(threads)
}
