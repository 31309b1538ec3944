//! Parallel cache-blocked square matrix multiplication.
//!
//! Computes `A = B · C` for N×N `f32` matrices and checks a multi-threaded
//! run against a single-threaded reference. Two ways to spread the work:
//!
//! - **Static**: rows split once into contiguous, tile-aligned bands, one
//!   per thread, each running the cache-blocked kernel.
//! - **Dynamic**: threads pull rows or single cells from a shared
//!   lock-guarded counter until it runs out.
//!
//! ## Usage
//!
//! ```
//! use parmatmul::{Granularity, Matrix, Strategy, multiply_parallel, multiply_serial, verify};
//!
//! let n = 64;
//! let b = Matrix::from_fn(n, |i, j| ((i + j) % 10) as f32).unwrap();
//! let c = Matrix::from_fn(n, |i, j| ((i * j) % 7) as f32).unwrap();
//!
//! let mut reference = Matrix::zeroed(n).unwrap();
//! multiply_serial(&mut reference, &b, &c).unwrap();
//!
//! let mut result = Matrix::zeroed(n).unwrap();
//! multiply_parallel(&mut result, &b, &c, 4, Strategy::Dynamic(Granularity::Row)).unwrap();
//!
//! let report = verify(&reference, &result, 1e-3).unwrap();
//! assert!(report.passed);
//! ```
//!
//! ## What's inside
//!
//! - 64-byte aligned storage with scoped release
//! - 128×128 tiled multiply-accumulate with per-thread scratch tiles
//! - Scoped worker threads, joined before every call returns

pub mod blocked;
pub mod config;
pub mod error;
pub mod matrix;
pub mod threaded;
pub mod verify;

pub use blocked::tiled::BLOCK_SIZE;
pub use error::{MatmulError, Result};
pub use matrix::Matrix;
pub use threaded::{Granularity, ParallelRun, Strategy, multiply_parallel};
pub use verify::{DEFAULT_TOLERANCE, Verification, verify};

/// Serial reference product: overwrites `a` with `b · c`.
///
/// Plain i-j-k inner products, no tiling.
///
/// # Errors
///
/// `DimensionMismatch` if the three matrices differ in size.
pub fn multiply_serial(a: &mut Matrix, b: &Matrix, c: &Matrix) -> Result<()> {
    a.check_same_size(b)?;
    a.check_same_size(c)?;
    let n = a.n();
    matrix::naive::matmul_naive_ijk(a.as_mut_slice(), b.as_slice(), c.as_slice(), n);
    Ok(())
}

/// Serial cache-blocked product: overwrites `a` with `b · c`.
///
/// Same kernel the static workers run, over the whole matrix on the calling
/// thread.
///
/// # Errors
///
/// `DimensionMismatch` on size mismatch, `Allocation` if the scratch tiles
/// can't be allocated.
pub fn multiply_serial_tiled(a: &mut Matrix, b: &Matrix, c: &Matrix) -> Result<()> {
    a.check_same_size(b)?;
    a.check_same_size(c)?;
    let n = a.n();
    blocked::tiled::multiply_tiled(a.as_mut_slice(), b.as_slice(), c.as_slice(), n)
}
