//! Candidate model summary.
//!
//! Every candidate gets a row, qualifying or not. Failed fits show up as
//! "not fit" with the failure reason instead of statistics.

use serde::Serialize;

use crate::models::{FitStatus, ModelCandidate};

pub const NOT_FIT: &str = "not fit";

/// CSV/JSON column names.
pub const SUMMARY_COLUMNS: [&str; 4] = ["model", "# obs", "adjusted r^2", "p-value"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "model")]
    pub model: String,
    #[serde(rename = "# obs")]
    pub n_obs: Option<usize>,
    #[serde(rename = "adjusted r^2")]
    pub r_squared_adj: Option<f64>,
    #[serde(rename = "p-value")]
    pub p_value: Option<f64>,
    /// Failure reason for candidates that were not fit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SummaryRow {
    pub fn is_fitted(&self) -> bool {
        self.failure.is_none()
    }
}

/// One row per candidate, in candidate order.
pub fn summarize(candidates: &[ModelCandidate]) -> Vec<SummaryRow> {
    candidates
        .iter()
        .map(|c| match c.status() {
            FitStatus::Fitted(fit) => SummaryRow {
                model: c.formula(),
                n_obs: Some(fit.n_obs()),
                r_squared_adj: Some(fit.r_squared_adj()),
                p_value: Some(fit.p_value()),
                failure: None,
            },
            FitStatus::Failed(reason) => SummaryRow {
                model: c.formula(),
                n_obs: None,
                r_squared_adj: None,
                p_value: None,
                failure: Some(reason.to_string()),
            },
        })
        .collect()
}

/// Terminal table: model form, observations, adjusted r² (2 places), p-value.
pub fn format_summary(title: &str, rows: &[SummaryRow]) -> String {
    let width = rows
        .iter()
        .map(|r| r.model.chars().count())
        .max()
        .unwrap_or(0)
        .max("Model form".len());

    let mut out = String::new();
    out.push_str(&format!("=== {title} ===\n"));
    out.push_str(&format!(
        "{:<width$}  {:>12}  {:>12}  {:>9}\n",
        "Model form", "Observations", "Adjusted r^2", "P value"
    ));
    out.push_str(&format!("{:-<width$}  {:-<12}  {:-<12}  {:-<9}\n", "", "", "", ""));

    for r in rows {
        let line = match (r.n_obs, r.r_squared_adj, r.p_value) {
            (Some(n), Some(r2), Some(p)) => format!(
                "{:<width$}  {:>12}  {:>12.2}  {:>9}",
                r.model,
                n,
                r2,
                format_p_value(p)
            ),
            _ => format!(
                "{:<width$}  {NOT_FIT} ({})",
                r.model,
                r.failure.as_deref().unwrap_or("unknown reason")
            ),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Scientific notation with one decimal and a signed two-digit exponent (`1.2E-05`).
pub fn format_p_value(p: f64) -> String {
    if !p.is_finite() {
        return p.to_string();
    }
    let raw = format!("{p:.1E}");
    match raw.split_once('E') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{generate_site, SyntheticConfig};
    use crate::domain::ModelSpec;
    use crate::fit::build_candidates;
    use chrono::Duration;

    #[test]
    fn p_value_formatting() {
        assert_eq!(format_p_value(1.234e-5), "1.2E-05");
        assert_eq!(format_p_value(0.05), "5.0E-02");
        assert_eq!(format_p_value(0.0), "0.0E+00");
        assert_eq!(format_p_value(1.0), "1.0E+00");
    }

    #[test]
    fn failed_candidates_are_listed() {
        let site = generate_site(&SyntheticConfig {
            days: 20,
            n_samples: 25,
            orthop_outage: None,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let specs = vec![
            ModelSpec::parse("log(SSC)", &["log(Turb_YSI)"]).unwrap(),
            ModelSpec::parse("log(SSC)", &["log(Nope)"]).unwrap(),
        ];
        let candidates =
            build_candidates(&specs, &site.constituents, &site.surrogates, Duration::minutes(30))
                .unwrap();

        let rows = summarize(&candidates);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_fitted());
        assert_eq!(rows[0].model, "log10(SSC) ~ log10(Turb_YSI)");
        assert!(!rows[1].is_fitted());
        assert_eq!(rows[1].n_obs, None);

        let text = format_summary("SSC", &rows);
        assert!(text.contains("Adjusted r^2"));
        assert!(text.contains(NOT_FIT));
        assert_eq!(text.lines().count(), 5);
    }
}
