//! Predicted response series with 90% interval bounds.

use chrono::NaiveDateTime;

use crate::domain::{Table, TimeSeries};
use crate::error::QwError;

pub const LOWER_SUFFIX: &str = "_L90";
pub const UPPER_SUFFIX: &str = "_U90";

/// Point estimates plus lower/upper bounds on one shared index.
///
/// A row is either fully present (estimate and both bounds) or fully missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSeries {
    response: String,
    timestamps: Vec<NaiveDateTime>,
    rows: Vec<Option<PredictionRow>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRow {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

impl PredictionSeries {
    pub fn new(
        response: impl Into<String>,
        timestamps: Vec<NaiveDateTime>,
        rows: Vec<Option<PredictionRow>>,
    ) -> Result<Self, QwError> {
        let response = response.into();
        if timestamps.len() != rows.len() {
            return Err(QwError::InvalidSeries(format!(
                "prediction '{response}' has {} timestamps but {} rows",
                timestamps.len(),
                rows.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(QwError::InvalidSeries(format!(
                "prediction '{response}' timestamps not strictly increasing"
            )));
        }
        Ok(Self {
            response,
            timestamps,
            rows,
        })
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn lower_name(&self) -> String {
        format!("{}{LOWER_SUFFIX}", self.response)
    }

    pub fn upper_name(&self) -> String {
        format!("{}{UPPER_SUFFIX}", self.response)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn rows(&self) -> &[Option<PredictionRow>] {
        &self.rows
    }

    pub fn count_present(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    pub fn estimate(&self) -> TimeSeries {
        self.series(self.response.clone(), |r| r.estimate)
    }

    pub fn lower(&self) -> TimeSeries {
        self.series(self.lower_name(), |r| r.lower)
    }

    pub fn upper(&self) -> TimeSeries {
        self.series(self.upper_name(), |r| r.upper)
    }

    fn series(&self, name: String, pick: impl Fn(&PredictionRow) -> f64) -> TimeSeries {
        TimeSeries::from_validated(
            name,
            self.timestamps.clone(),
            self.rows.iter().map(|r| r.as_ref().map(&pick)).collect(),
        )
    }

    /// Three-column table: `<response>`, `<response>_L90`, `<response>_U90`.
    pub fn to_table(&self) -> Table {
        let column = |pick: fn(&PredictionRow) -> f64| -> Vec<Option<f64>> {
            self.rows.iter().map(|r| r.as_ref().map(pick)).collect()
        };
        Table::from_validated(
            self.timestamps.clone(),
            vec![
                (self.response.clone(), column(|r| r.estimate)),
                (self.lower_name(), column(|r| r.lower)),
                (self.upper_name(), column(|r| r.upper)),
            ],
        )
    }

    /// `table` with the prediction columns merged in; predicted values replace
    /// any existing values in same-named columns.
    pub fn merged_into(&self, table: &Table) -> Table {
        table.overlay(&self.to_table())
    }
}
