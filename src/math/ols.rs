//! Ordinary least squares.
//!
//! Surrogate regressions are small problems: tens to a few hundred matched
//! samples and two to four columns (intercept plus surrogates). We solve
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! with an SVD, which also gives a direct rank check. A rank-deficient design
//! (e.g. two identical surrogate columns, or a constant surrogate) is reported
//! as `None` rather than solved with a pseudo-inverse: the resulting
//! coefficients and standard errors would not be meaningful.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff for the rank check.
const RANK_RTOL: f64 = 1e-10;

/// Full OLS solution with the pieces needed for inference.
#[derive(Debug, Clone)]
pub struct OlsSolution {
    pub beta: DVector<f64>,
    /// `(XᵀX)⁻¹`, used for coefficient and prediction variances.
    pub xtx_inv: DMatrix<f64>,
    pub residuals: DVector<f64>,
    pub sse: f64,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y ~ X` by OLS. `None` if `X` is rank deficient.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsSolution> {
    let p = x.ncols();
    if x.nrows() < p || x.nrows() != y.len() {
        return None;
    }

    let svd = x.clone().svd(false, false);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) || svd.rank(max_sv * RANK_RTOL) < p {
        return None;
    }

    let beta = solve_least_squares(x, y)?;
    let xtx_inv = (x.transpose() * x).try_inverse()?;
    let residuals = y - x * &beta;
    let sse = residuals.norm_squared();

    Some(OlsSolution {
        beta,
        xtx_inv,
        residuals,
        sse,
    })
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
    fn ols_reports_residuals_and_inverse() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 3.0, 5.0, 8.0]);

        let sol = ols(&x, &y).unwrap();
        let sum_resid: f64 = sol.residuals.iter().sum();
        assert!(sum_resid.abs() < 1e-10, "intercept model residuals sum to zero");
        assert!(sol.sse > 0.0);
        let ident = (x.transpose() * &x) * &sol.xtx_inv;
        assert!((ident[(0, 0)] - 1.0).abs() < 1e-10);
        assert!(ident[(0, 1)].abs() < 1e-10);
    }

    #[test]
    fn ols_rejects_collinear_columns() {
        // Second and third columns are identical.
        let x = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 1.0, 3.0, 3.0, 1.0, 4.0, 4.0],
        );
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert!(ols(&x, &y).is_none());
    }
}
