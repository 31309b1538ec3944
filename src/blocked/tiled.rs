//! Tiled multiply-accumulate over a band of output rows.

use crate::error::Result;
use crate::matrix::aligned::AlignedBuffer;
use std::ops::Range;

/// Tile side. Two 128×128 f32 tiles are 128 KiB, sized for L2.
pub const BLOCK_SIZE: usize = 128;

/// Cache-blocked `A += B · C` for rows `rows` of A.
///
/// `a_rows` is the output band for exactly those rows (`rows.len() * n`
/// elements, row `rows.start` first). The caller zeroes it beforehand if a
/// plain product is wanted.
///
/// Loop nest: row tiles, then k tiles, then column tiles. The B tile for a
/// (row-tile, k-tile) pair is copied once and reused across every column
/// tile; the C tile is copied again per (k-tile, column-tile). Edge tiles are
/// clipped to whatever is left when `n` isn't a multiple of the tile side.
///
/// # Errors
///
/// `Allocation` if either scratch tile can't be allocated.
///
/// # Panics
///
/// Panics if the slice sizes don't match `n` and `rows`.
pub fn multiply_region(
    a_rows: &mut [f32],
    b: &[f32],
    c: &[f32],
    n: usize,
    rows: Range<usize>,
) -> Result<()> {
    multiply_region_with_block(BLOCK_SIZE, a_rows, b, c, n, rows)
}

/// [`multiply_region`] with an explicit tile side.
pub fn multiply_region_with_block(
    block: usize,
    a_rows: &mut [f32],
    b: &[f32],
    c: &[f32],
    n: usize,
    rows: Range<usize>,
) -> Result<()> {
    assert!(block > 0, "tile side must be non-zero");
    assert!(rows.end <= n, "rows {:?} out of bounds for n={}", rows, n);
    assert_eq!(a_rows.len(), rows.len() * n, "A band: expected {} rows of {}", rows.len(), n);
    assert_eq!(b.len(), n * n, "B: expected {}x{}={} elements", n, n, n * n);
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);

    if rows.is_empty() {
        return Ok(());
    }

    let mut b_tile = AlignedBuffer::zeroed(block * block)?;
    let mut c_tile = AlignedBuffer::zeroed(block * block)?;

    for ii in rows.clone().step_by(block) {
        let i_len = block.min(rows.end - ii);

        for kk in (0..n).step_by(block) {
            let k_len = block.min(n - kk);

            // B stays put for every column tile below
            copy_tile(b, n, ii, kk, i_len, k_len, &mut b_tile, block);

            for jj in (0..n).step_by(block) {
                let j_len = block.min(n - jj);

                copy_tile(c, n, kk, jj, k_len, j_len, &mut c_tile, block);

                for i in 0..i_len {
                    let out_start = (ii - rows.start + i) * n + jj;
                    let a_row = &mut a_rows[out_start..out_start + j_len];
                    let b_row = &b_tile[i * block..i * block + k_len];

                    for (k, &b_ik) in b_row.iter().enumerate() {
                        let c_row = &c_tile[k * block..k * block + j_len];
                        for (x, &c_kj) in a_row.iter_mut().zip(c_row) {
                            *x += b_ik * c_kj;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Full serial tiled product: overwrites `a` with `b · c`.
pub fn multiply_tiled(a: &mut [f32], b: &[f32], c: &[f32], n: usize) -> Result<()> {
    a.fill(0.0);
    multiply_region(a, b, c, n, 0..n)
}

// Copy a rows×cols sub-rectangle starting at (row0, col0) of an n×n matrix
// into a tile with row stride `stride`.
#[allow(clippy::too_many_arguments)]
fn copy_tile(
    src: &[f32],
    n: usize,
    row0: usize,
    col0: usize,
    rows: usize,
    cols: usize,
    tile: &mut [f32],
    stride: usize,
) {
    for r in 0..rows {
        let from = (row0 + r) * n + col0;
        tile[r * stride..r * stride + cols].copy_from_slice(&src[from..from + cols]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::naive::matmul_naive_ijk;

    fn inputs(n: usize) -> (Vec<f32>, Vec<f32>) {
        let b: Vec<f32> = (0..n * n).map(|i| (i % 10) as f32).collect();
        let c: Vec<f32> = (0..n * n).map(|i| (i % 7) as f32 * 0.5).collect();
        (b, c)
    }

    #[test]
    fn test_tiled_matches_naive_bitwise() {
        for n in [1, 2, 7, 16, 33] {
            let (b, c) = inputs(n);
            let mut expected = vec![0.0; n * n];
            let mut got = vec![0.0; n * n];

            matmul_naive_ijk(&mut expected, &b, &c, n);
            multiply_tiled(&mut got, &b, &c, n).unwrap();

            assert_eq!(expected, got, "n={}", n);
        }
    }

    #[test]
    fn test_small_blocks_clip_edges() {
        let n = 13;
        let (b, c) = inputs(n);
        let mut expected = vec![0.0; n * n];
        matmul_naive_ijk(&mut expected, &b, &c, n);

        for block in [1, 2, 4, 5, 12, 13, 64] {
            let mut got = vec![0.0; n * n];
            multiply_region_with_block(block, &mut got, &b, &c, n, 0..n).unwrap();
            assert_eq!(expected, got, "block={}", block);
        }
    }

    #[test]
    fn test_region_only_touches_its_band() {
        let n = 10;
        let (b, c) = inputs(n);
        let mut expected = vec![0.0; n * n];
        matmul_naive_ijk(&mut expected, &b, &c, n);

        let mut band = vec![0.0; 3 * n];
        multiply_region_with_block(4, &mut band, &b, &c, n, 4..7).unwrap();

        assert_eq!(&expected[4 * n..7 * n], &band[..]);
    }

    #[test]
    fn test_accumulates_into_existing_values() {
        let n = 6;
        let (b, c) = inputs(n);
        let mut product = vec![0.0; n * n];
        matmul_naive_ijk(&mut product, &b, &c, n);

        let mut a = vec![5.0; n * n];
        multiply_region_with_block(4, &mut a, &b, &c, n, 0..n).unwrap();

        for (x, p) in a.iter().zip(&product) {
            assert_eq!(*x, 5.0 + p);
        }
    }

    #[test]
    fn test_empty_range_is_noop() {
        let n = 4;
        let (b, c) = inputs(n);
        let mut band: Vec<f32> = Vec::new();
        multiply_region(&mut band, &b, &c, n, 2..2).unwrap();
    }
}
