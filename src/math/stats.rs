//! Distribution helpers for regression inference.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Upper-tail probability of the overall F statistic.
///
/// Returns `None` when the degrees of freedom are not positive or the
/// statistic is not a number.
pub fn f_test_p_value(f_stat: f64, df_model: f64, df_resid: f64) -> Option<f64> {
    if f_stat.is_nan() || df_model <= 0.0 || df_resid <= 0.0 {
        return None;
    }
    if f_stat.is_infinite() {
        return Some(0.0);
    }
    let dist = FisherSnedecor::new(df_model, df_resid).ok()?;
    Some(dist.sf(f_stat.max(0.0)))
}

/// Two-sided Student-t critical value for a `level` interval (e.g. 0.90).
pub fn t_critical(level: f64, df: f64) -> Option<f64> {
    if !(0.0 < level && level < 1.0) || df <= 0.0 {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some(dist.inverse_cdf(0.5 + level / 2.0))
}

/// Duan's smearing estimate: the mean of the back-transformed residuals.
///
/// Multiplying a back-transformed log-space prediction by this factor turns
/// an estimate of the median into an estimate of the mean.
pub fn duan_smearing(residuals: &[f64], invert: impl Fn(f64) -> f64) -> f64 {
    if residuals.is_empty() {
        return 1.0;
    }
    residuals.iter().map(|&e| invert(e)).sum::<f64>() / residuals.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn t_critical_matches_tables() {
        // t(0.95, 10) = 1.8125
        assert_abs_diff_eq!(t_critical(0.90, 10.0).unwrap(), 1.8125, epsilon = 1e-4);
        assert!(t_critical(1.5, 10.0).is_none());
    }

    #[test]
    fn f_p_value_is_upper_tail() {
        // F(1, 10) critical value at 0.05 is 4.9646.
        assert_abs_diff_eq!(f_test_p_value(4.9646, 1.0, 10.0).unwrap(), 0.05, epsilon = 1e-4);
        assert_eq!(f_test_p_value(f64::INFINITY, 1.0, 10.0), Some(0.0));
        assert!(f_test_p_value(1.0, 1.0, 0.0).is_none());
    }

    #[test]
    fn smearing_exceeds_one_for_symmetric_log_residuals() {
        let resid = [-0.1, 0.1, -0.2, 0.2];
        let factor = duan_smearing(&resid, |e| 10f64.powf(e));
        assert!(factor > 1.0);
        assert_eq!(duan_smearing(&[], |e| e.exp()), 1.0);
    }
}
