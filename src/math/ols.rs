//! Least squares solver for small lag regressions.
//!
//! The forecast model estimates its coefficients from regressions of the form:
//!
//! ```text
//! minimize Σ (y_t - x_t^T β)^2
//! ```
//!
//! where `x_t` holds lagged values (and lagged innovations) of a short series.
//!
//! Implementation choices:
//! - We solve with SVD so tall systems (more rows than columns) are handled.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Collinear lag columns are common for short or trending series, so a
//!   singular-value cutoff gives the minimum-norm solution instead of failing.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Regress `targets` on row-major `rows` (no intercept column is added).
///
/// Returns `None` when the system is empty, ragged, or cannot be solved.
pub fn regress(rows: &[Vec<f64>], targets: &[f64]) -> Option<Vec<f64>> {
    let n = rows.len();
    let k = rows.first()?.len();
    if k == 0 || n != targets.len() || n < k || rows.iter().any(|r| r.len() != k) {
        return None;
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let x = DMatrix::from_row_slice(n, k, &flat);
    let y = DVector::from_column_slice(targets);
    solve_least_squares(&x, &y).map(|beta| beta.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn regress_recovers_lag_coefficient() {
        // y_t = 0.5 * y_{t-1}
        let series = [8.0, 4.0, 2.0, 1.0, 0.5];
        let rows: Vec<Vec<f64>> = series[..4].iter().map(|v| vec![*v]).collect();
        let beta = regress(&rows, &series[1..]).unwrap();
        assert!((beta[0] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn regress_rejects_underdetermined_or_ragged_input() {
        assert!(regress(&[], &[]).is_none());
        assert!(regress(&[vec![1.0, 2.0]], &[1.0]).is_none());
        assert!(regress(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn collinear_columns_yield_minimum_norm_solution() {
        // Second column is identically zero.
        let rows = vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]];
        let beta = regress(&rows, &[2.0, 4.0, 6.0]).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-8);
        assert!(beta[1].abs() < 1e-8);
    }
}
