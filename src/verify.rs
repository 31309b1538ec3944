//! Element-wise comparison of two results under an absolute tolerance.

use crate::error::Result;
use crate::matrix::Matrix;

/// Default absolute tolerance for comparing a parallel result to the
/// serial reference.
pub const DEFAULT_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub passed: bool,
    /// Largest `|expected - actual|` over every element. Equal values count
    /// as zero even when infinite; NaN differences are skipped, but an
    /// infinite difference is kept.
    pub max_diff: f32,
    /// Elements whose difference exceeds the tolerance (or is NaN).
    pub mismatches: usize,
    /// `(row, col)` of the first mismatch in row-major order.
    pub first_mismatch: Option<(usize, usize)>,
}

/// Compares `expected` and `actual` element by element.
///
/// Always scans the whole matrix, so `max_diff` is the true maximum even
/// when a mismatch shows up early. Elements that compare equal always
/// match, so two identical overflowed results pass. A NaN on either side
/// counts as a mismatch but doesn't feed `max_diff`.
///
/// # Errors
///
/// `DimensionMismatch` if the matrices differ in size. Exceeding the
/// tolerance is not an error; it's reported through `passed`.
pub fn verify(expected: &Matrix, actual: &Matrix, tolerance: f32) -> Result<Verification> {
    expected.check_same_size(actual)?;
    Ok(compare_slices(expected.as_slice(), actual.as_slice(), expected.n(), tolerance))
}

/// [`verify`] over raw row-major slices of an n×n matrix.
///
/// # Panics
///
/// If either slice is not exactly `n * n` long, or `n == 0`.
pub fn compare_slices(expected: &[f32], actual: &[f32], n: usize, tolerance: f32) -> Verification {
    assert!(n > 0, "empty matrix");
    assert_eq!(expected.len(), n * n, "expected is not {}x{}", n, n);
    assert_eq!(actual.len(), n * n, "actual is not {}x{}", n, n);

    let mut max_diff = 0.0f32;
    let mut mismatches = 0;
    let mut first_mismatch = None;

    for (idx, (&x, &y)) in expected.iter().zip(actual).enumerate() {
        // inf - inf is NaN
        let diff = if x == y { 0.0 } else { (x - y).abs() };
        if diff.is_nan() || diff > tolerance {
            mismatches += 1;
            first_mismatch.get_or_insert((idx / n, idx % n));
        }
        // f32::max ignores NaN
        max_diff = max_diff.max(diff);
    }

    Verification {
        passed: mismatches == 0,
        max_diff,
        mismatches,
        first_mismatch,
    }
}
