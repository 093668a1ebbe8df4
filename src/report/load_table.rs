//! Per-site load table.
//!
//! Rows are sites, columns are constituent labels. With water years requested,
//! each label expands to one column per water year plus a `mean` column.

use serde::Serialize;

use crate::error::QwError;

/// What a load column aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    /// Mean-based estimate over the full record.
    Record,
    /// Load for one water year.
    WaterYear(i32),
    /// Mean-based estimate over the requested water-year span.
    Mean,
}

impl Period {
    pub fn label(&self) -> Option<String> {
        match self {
            Period::Record => None,
            Period::WaterYear(wy) => Some(wy.to_string()),
            Period::Mean => Some("mean".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadRow {
    pub site: String,
    /// Label-major: all periods of the first label, then the next label.
    pub values: Vec<Option<f64>>,
}

/// A site (or one constituent at a site) that could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub site: String,
    pub constituent: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadTable {
    labels: Vec<String>,
    periods: Vec<Period>,
    rows: Vec<LoadRow>,
    failures: Vec<LoadFailure>,
}

impl LoadTable {
    /// Empty table; `water_years` empty means a single full-record column per label.
    pub fn new(labels: Vec<String>, water_years: &[i32]) -> Self {
        let periods = if water_years.is_empty() {
            vec![Period::Record]
        } else {
            water_years
                .iter()
                .map(|&wy| Period::WaterYear(wy))
                .chain(std::iter::once(Period::Mean))
                .collect()
        };
        Self {
            labels,
            periods,
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn rows(&self) -> &[LoadRow] {
        &self.rows
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// Column headers in value order.
    pub fn headers(&self) -> Vec<String> {
        self.labels
            .iter()
            .flat_map(|label| {
                self.periods.iter().map(move |p| match p.label() {
                    Some(suffix) => format!("{label} {suffix}"),
                    None => label.clone(),
                })
            })
            .collect()
    }

    pub fn push_row(&mut self, site: impl Into<String>, values: Vec<Option<f64>>) -> Result<(), QwError> {
        let site = site.into();
        let expected = self.labels.len() * self.periods.len();
        if values.len() != expected {
            return Err(QwError::InvalidSeries(format!(
                "load row for site {site} has {} values, expected {expected}",
                values.len()
            )));
        }
        self.rows.push(LoadRow { site, values });
        Ok(())
    }

    pub fn push_failure(&mut self, site: impl Into<String>, constituent: Option<String>, message: impl Into<String>) {
        self.failures.push(LoadFailure {
            site: site.into(),
            constituent,
            message: message.into(),
        });
    }

    /// Value for `site`, constituent `label` and `period`.
    pub fn value(&self, site: &str, label: &str, period: Period) -> Option<f64> {
        let l = self.labels.iter().position(|x| x == label)?;
        let p = self.periods.iter().position(|x| *x == period)?;
        let row = self.rows.iter().find(|r| r.site == site)?;
        row.values.get(l * self.periods.len() + p).copied().flatten()
    }
}

/// Fixed-width terminal rendering. Missing loads print as `-`.
pub fn format_load_table(table: &LoadTable) -> String {
    let headers = table.headers();
    let site_width = table
        .rows
        .iter()
        .map(|r| r.site.len())
        .chain(std::iter::once("Site ID".len()))
        .max()
        .unwrap_or(7);

    let mut out = String::new();
    let mut line = format!("{:<site_width$}", "Site ID");
    for h in &headers {
        line.push_str(&format!("  {h:>16}"));
    }
    out.push_str(line.trim_end());
    out.push('\n');

    for row in &table.rows {
        let mut line = format!("{:<site_width$}", row.site);
        for (h, v) in headers.iter().zip(&row.values) {
            let w = h.chars().count().max(16);
            let cell = v.map(|x| format!("{x:.1}")).unwrap_or_else(|| "-".to_string());
            line.push_str(&format!("  {cell:>w$}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if !table.failures.is_empty() {
        out.push_str("\nNot computed:\n");
        for f in &table.failures {
            match &f.constituent {
                Some(c) => out.push_str(&format!("- {} ({c}): {}\n", f.site, f.message)),
                None => out.push_str(&format!("- {}: {}\n", f.site, f.message)),
            }
        }
    }
    out
}
