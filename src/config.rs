//! Run configuration for the comparison driver.

use crate::error::{MatmulError, Result};
use crate::threaded::{Granularity, Strategy};
use crate::verify::DEFAULT_TOLERANCE;

pub const USAGE: &str = "Usage: parmatmul <matrix_size> <num_threads>";

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub matrix_size: usize,
    /// Requested before any clamping.
    pub requested_threads: usize,
    pub tolerance: f32,
    /// Strategies compared against the serial reference, in order.
    pub strategies: Vec<Strategy>,
    /// Side of the top-left corner printed for each matrix.
    pub display_size: usize,
    /// Inputs are sampled uniformly from `[0, input_max)`.
    pub input_max: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            matrix_size: 512,
            requested_threads: 4,
            tolerance: DEFAULT_TOLERANCE,
            strategies: vec![
                Strategy::Static,
                Strategy::Dynamic(Granularity::Row),
                Strategy::Dynamic(Granularity::Cell),
            ],
            display_size: 5,
            input_max: 10.0,
        }
    }
}

impl RunConfig {
    /// Parses `<matrix_size> <num_threads>` (program name already stripped).
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let [size, threads] = args.as_slice() else {
            return Err(MatmulError::Usage(USAGE.to_string()));
        };

        Ok(Self {
            matrix_size: parse_positive("matrix_size", size.as_ref())?,
            requested_threads: parse_positive("num_threads", threads.as_ref())?,
            ..Self::default()
        })
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(MatmulError::Usage(format!(
            "{} must be a positive integer, got {:?}\n{}",
            name, value, USAGE
        ))),
    }
}
