//! Square matrix storage and the serial reference product.
//!
//! A [`Matrix`] is N×N `f32` in row-major order, backed by a single
//! cache-aligned allocation. Inputs and outputs are always distinct
//! `Matrix` values, so the borrow checker is what keeps the output from
//! aliasing an input.

pub mod aligned;
pub mod naive;

use crate::error::{MatmulError, Result};
use aligned::AlignedBuffer;
use rand::Rng;
use std::fmt;
use std::ops::Range;

pub struct Matrix {
    n: usize,
    data: AlignedBuffer,
}

impl Matrix {
    /// Allocates an N×N matrix of zeros.
    ///
    /// # Errors
    ///
    /// `InvalidDimension` for `n == 0`, `Allocation` if the aligned request
    /// can't be satisfied.
    pub fn zeroed(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(MatmulError::InvalidDimension(n));
        }
        let len = n
            .checked_mul(n)
            .ok_or(MatmulError::Allocation { bytes: usize::MAX })?;
        let data = AlignedBuffer::zeroed(len)?;
        Ok(Self { n, data })
    }

    /// Builds a matrix where element (i, j) is `f(i, j)`.
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> f32) -> Result<Self> {
        let mut m = Self::zeroed(n)?;
        for (idx, x) in m.data.iter_mut().enumerate() {
            *x = f(idx / n, idx % n);
        }
        Ok(m)
    }

    pub fn identity(n: usize) -> Result<Self> {
        Self::from_fn(n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    /// Copies a row-major slice of exactly `n * n` elements.
    pub fn from_slice(n: usize, values: &[f32]) -> Result<Self> {
        if values.len() != n * n {
            return Err(MatmulError::LengthMismatch {
                expected: n * n,
                got: values.len(),
            });
        }
        let mut m = Self::zeroed(n)?;
        m.data.copy_from_slice(values);
        Ok(m)
    }

    /// Fills every element with a uniform sample from `range`.
    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R, range: Range<f32>) {
        for x in self.data.iter_mut() {
            *x = rng.gen_range(range.clone());
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.n + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.n + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.n..(row + 1) * self.n]
    }

    /// Zeroes rows `[rows.start, rows.end)`.
    pub fn zero_rows(&mut self, rows: Range<usize>) {
        let n = self.n;
        self.data[rows.start * n..rows.end * n].fill(0.0);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn try_clone(&self) -> Result<Self> {
        Self::from_slice(self.n, &self.data)
    }

    /// Errors unless `other` has the same dimension as `self`.
    pub(crate) fn check_same_size(&self, other: &Matrix) -> Result<()> {
        if self.n != other.n {
            return Err(MatmulError::DimensionMismatch {
                expected: self.n,
                got: other.n,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix").field("n", &self.n).finish()
    }
}
