/// Serial reference product using i-j-k loop order.
///
/// Overwrites `a` with `b · c`. Each element is a plain inner product with
/// k in ascending order, which is the accumulation order every other
/// kernel in this crate reproduces. Slow (C is walked with stride `n`), so
/// use it as a correctness baseline.
///
/// # Arguments
///
/// * `a` - Output (n × n), row-major, overwritten
/// * `b` - Left input (n × n), row-major
/// * `c` - Right input (n × n), row-major
/// * `n` - Dimension
pub fn matmul_naive_ijk(a: &mut [f32], b: &[f32], c: &[f32], n: usize) {
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] = dot_cell(b, c, n, i, j);
        }
    }
}

/// Element (i, j) of `b · c`.
#[inline]
pub fn dot_cell(b: &[f32], c: &[f32], n: usize, i: usize, j: usize) -> f32 {
    let b_row = &b[i * n..(i + 1) * n];
    let mut sum = 0.0f32;
    for (k, &b_ik) in b_row.iter().enumerate() {
        sum += b_ik * c[k * n + j];
    }
    sum
}

/// Row i of `b · c`, written into `out` (length n).
#[inline]
pub fn dot_row(b: &[f32], c: &[f32], n: usize, i: usize, out: &mut [f32]) {
    for (j, x) in out.iter_mut().enumerate() {
        *x = dot_cell(b, c, n, i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2x2() {
        let b = [1.0, 2.0, 3.0, 4.0];
        let c = [5.0, 6.0, 7.0, 8.0];
        let mut a = [f32::NAN; 4];

        matmul_naive_ijk(&mut a, &b, &c, 2);

        assert_eq!(a, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_dot_row_matches_cells() {
        let n = 5;
        let b: Vec<f32> = (0..n * n).map(|i| (i % 7) as f32).collect();
        let c: Vec<f32> = (0..n * n).map(|i| (i % 3) as f32 - 1.0).collect();
        let mut row = vec![0.0; n];

        dot_row(&b, &c, n, 2, &mut row);

        for (j, &x) in row.iter().enumerate() {
            assert_eq!(x, dot_cell(&b, &c, n, 2, j));
        }
    }
}
