//! Regression capability used by model candidates.
//!
//! Candidates never look inside a fitted model. Everything they need (fit
//! statistics, residuals for bias correction, interval predictions) goes
//! through [`FittedRegression`], so the backend can be swapped without touching
//! selection or merging code. [`Ols`] is the default backend.
//!
//! All values crossing this interface are in *transformed* space.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::error::FitFailure;
use crate::math::{f_test_p_value, ols, t_critical};

/// Prediction interval level used throughout the reports (90%).
pub const PREDICTION_INTERVAL_LEVEL: f64 = 0.90;

/// Regression input: one response value and one explanatory row per sample.
///
/// Rows hold the surrogate terms only; the intercept is added by the backend.
/// `n_terms` is fixed by the model form, so an empty design still knows how
/// many samples it would need.
#[derive(Debug, Clone, Default)]
pub struct Design {
    pub n_terms: usize,
    pub response: Vec<f64>,
    pub rows: Vec<Vec<f64>>,
}

impl Design {
    pub fn new(n_terms: usize) -> Self {
        Self {
            n_terms,
            ..Self::default()
        }
    }

    pub fn push(&mut self, response: f64, row: Vec<f64>) {
        self.response.push(response);
        self.rows.push(row);
    }

    pub fn n_obs(&self) -> usize {
        self.response.len()
    }
}

/// Point estimate with its prediction interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalEstimate {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

pub trait FittedRegression: Send + Sync + fmt::Debug {
    fn n_obs(&self) -> usize;
    /// F-test p-value for overall model significance.
    fn p_value(&self) -> f64;
    fn r_squared_adj(&self) -> f64;
    /// Intercept first, then one coefficient per explanatory term.
    fn coefficients(&self) -> &[f64];
    fn residuals(&self) -> &[f64];
    fn predict(&self, row: &[f64]) -> IntervalEstimate;
}

pub trait Regression: Send + Sync {
    fn fit(&self, design: &Design) -> Result<Arc<dyn FittedRegression>, FitFailure>;
}

/// Ordinary least squares with an intercept.
#[derive(Debug, Clone, Copy)]
pub struct Ols {
    pub interval_level: f64,
}

impl Default for Ols {
    fn default() -> Self {
        Self {
            interval_level: PREDICTION_INTERVAL_LEVEL,
        }
    }
}

impl Regression for Ols {
    fn fit(&self, design: &Design) -> Result<Arc<dyn FittedRegression>, FitFailure> {
        let n = design.n_obs();
        let k = design.n_terms;
        let p = k + 1;
        // At least one residual degree of freedom.
        let required = p + 1;
        if n < required {
            return Err(FitFailure::InsufficientSamples {
                matched: n,
                required,
            });
        }
        if design.rows.len() != n || design.rows.iter().any(|r| r.len() != k) {
            return Err(FitFailure::Other("ragged design rows".to_string()));
        }
        // The SVD panics on NaN.
        if design
            .response
            .iter()
            .chain(design.rows.iter().flatten())
            .any(|v| !v.is_finite())
        {
            return Err(FitFailure::Other("non-finite value in design".to_string()));
        }

        let x = DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { design.rows[i][j - 1] });
        let y = DVector::from_column_slice(&design.response);

        let solution = ols(&x, &y).ok_or(FitFailure::SingularFit)?;

        let mean = y.mean();
        let sst: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        if !(sst > 0.0) {
            return Err(FitFailure::Other("response has no variance".to_string()));
        }

        let sse = solution.sse;
        let df_model = k as f64;
        let df_resid = (n - p) as f64;

        let r_squared = 1.0 - sse / sst;
        let r_squared_adj = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_resid;

        let f_stat = if sse > 0.0 {
            ((sst - sse) / df_model) / (sse / df_resid)
        } else {
            f64::INFINITY
        };
        let p_value = f_test_p_value(f_stat, df_model, df_resid)
            .ok_or_else(|| FitFailure::Other("F-test undefined".to_string()))?;
        let t_crit = t_critical(self.interval_level, df_resid)
            .ok_or_else(|| FitFailure::Other("invalid prediction interval level".to_string()))?;

        Ok(Arc::new(OlsFit {
            coefficients: solution.beta.iter().copied().collect(),
            residuals: solution.residuals.iter().copied().collect(),
            xtx_inv: solution.xtx_inv,
            mse: sse / df_resid,
            n_obs: n,
            p_value,
            r_squared_adj,
            t_crit,
        }))
    }
}

#[derive(Debug, Clone)]
struct OlsFit {
    coefficients: Vec<f64>,
    residuals: Vec<f64>,
    xtx_inv: DMatrix<f64>,
    mse: f64,
    n_obs: usize,
    p_value: f64,
    r_squared_adj: f64,
    t_crit: f64,
}

impl FittedRegression for OlsFit {
    fn n_obs(&self) -> usize {
        self.n_obs
    }

    fn p_value(&self) -> f64 {
        self.p_value
    }

    fn r_squared_adj(&self) -> f64 {
        self.r_squared_adj
    }

    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn predict(&self, row: &[f64]) -> IntervalEstimate {
        debug_assert_eq!(row.len() + 1, self.coefficients.len());
        let x0 = DVector::from_iterator(
            self.coefficients.len(),
            std::iter::once(1.0).chain(row.iter().copied()),
        );
        let estimate: f64 = self
            .coefficients
            .iter()
            .zip(x0.iter())
            .map(|(b, x)| b * x)
            .sum();
        let leverage = (x0.transpose() * &self.xtx_inv * &x0)[(0, 0)];
        let half_width = self.t_crit * (self.mse * (1.0 + leverage)).sqrt();
        IntervalEstimate {
            estimate,
            lower: estimate - half_width,
            upper: estimate + half_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn line_design(n: usize, noise: &[f64]) -> Design {
        Design {
            n_terms: 1,
            response: (0..n)
                .map(|i| 1.0 + 0.5 * i as f64 + noise[i % noise.len()])
                .collect(),
            rows: (0..n).map(|i| vec![i as f64]).collect(),
        }
    }

    #[test]
    fn recovers_line_and_reports_significance() {
        let fit = Ols::default()
            .fit(&line_design(20, &[0.05, -0.05, 0.02, -0.02]))
            .unwrap();
        assert_abs_diff_eq!(fit.coefficients()[0], 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(fit.coefficients()[1], 0.5, epsilon = 0.01);
        assert!(fit.r_squared_adj() > 0.99);
        assert!(fit.p_value() < 1e-6);
        assert_eq!(fit.n_obs(), 20);
    }

    #[test]
    fn prediction_interval_brackets_estimate_and_widens_away_from_center() {
        let fit = Ols::default()
            .fit(&line_design(20, &[0.1, -0.1, 0.05, -0.05]))
            .unwrap();
        let center = fit.predict(&[9.5]);
        let edge = fit.predict(&[40.0]);
        assert!(center.lower < center.estimate && center.estimate < center.upper);
        assert!(edge.upper - edge.lower > center.upper - center.lower);
    }

    #[test]
    fn too_few_samples_fail() {
        let design = Design {
            n_terms: 1,
            response: vec![1.0, 2.0],
            rows: vec![vec![1.0], vec![2.0]],
        };
        assert_eq!(
            Ols::default().fit(&design).unwrap_err(),
            FitFailure::InsufficientSamples {
                matched: 2,
                required: 3
            }
        );
    }

    #[test]
    fn constant_surrogate_is_singular() {
        let design = Design {
            n_terms: 1,
            response: vec![1.0, 2.0, 3.0, 4.0],
            rows: vec![vec![5.0]; 4],
        };
        assert_eq!(Ols::default().fit(&design).unwrap_err(), FitFailure::SingularFit);
    }

    #[test]
    fn empty_design_reports_samples_needed_for_its_terms() {
        assert_eq!(
            Ols::default().fit(&Design::new(2)).unwrap_err(),
            FitFailure::InsufficientSamples {
                matched: 0,
                required: 4
            }
        );
    }

    #[test]
    fn non_finite_design_fails_instead_of_panicking() {
        let mut design = line_design(10, &[0.05, -0.05]);
        design.rows[3][0] = f64::NAN;
        assert!(matches!(
            Ols::default().fit(&design),
            Err(FitFailure::Other(_))
        ));

        let mut design = line_design(10, &[0.05, -0.05]);
        design.response[5] = f64::INFINITY;
        assert!(matches!(
            Ols::default().fit(&design),
            Err(FitFailure::Other(_))
        ));
    }
}
