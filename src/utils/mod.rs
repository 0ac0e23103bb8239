//! Utility functions and helpers

pub mod formats;
pub mod random;

/// Computes an exclusive prefix sum; the result has one more element than
/// `counts` and ends with their total
pub fn exclusive_scan(counts: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(counts.len() + 1);
    let mut sum = 0;

    result.push(0);
    for &count in counts {
        sum += count;
        result.push(sum);
    }

    result
}

/// True when `|x - y| <= rel_tol * max(1, |x|, |y|)`
pub fn approx_eq(x: f64, y: f64, rel_tol: f64) -> bool {
    let scale = 1f64.max(x.abs()).max(y.abs());
    (x - y).abs() <= rel_tol * scale
}
