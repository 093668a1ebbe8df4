//! One surrogate regression candidate.
//!
//! A candidate is fit exactly once and is immutable afterwards. Fitting never
//! returns an error: failures are recorded in [`FitStatus::Failed`] so the
//! candidate still shows up in diagnostics.
//!
//! Back-transformation: when the constituent is log-transformed, predictions
//! are mapped back to native units and multiplied by Duan's smearing factor
//! (mean of the back-transformed residuals). Exponentiating the log-space mean
//! alone would estimate the median, which is biased low. The same factor is
//! applied to both interval bounds so the interval stays centred on the same
//! scale as the estimate.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::domain::{ModelSpec, Table, Transform, Variable};
use crate::error::{FitFailure, QwError};
use crate::math::duan_smearing;
use crate::models::matching::{match_samples, MatchedSample};
use crate::models::prediction::{PredictionRow, PredictionSeries};
use crate::models::regression::{Design, FittedRegression, IntervalEstimate, Regression};

#[derive(Debug, Clone)]
pub enum FitStatus {
    Fitted(Arc<dyn FittedRegression>),
    Failed(FitFailure),
}

#[derive(Debug, Clone)]
pub struct ModelCandidate {
    spec: ModelSpec,
    status: FitStatus,
    bias_correction: f64,
    /// Calibration data; `None` when a required column was missing.
    samples: Option<CalibrationSamples>,
    training: Arc<Table>,
}

/// Lab samples seen by one fit and what became of them.
#[derive(Debug, Clone, Default)]
struct CalibrationSamples {
    /// Every present lab sample of the constituent.
    lab: Vec<(NaiveDateTime, f64)>,
    /// Samples with a reading for every surrogate within tolerance.
    matched: Vec<MatchedSample>,
    /// Matched samples dropped from the design (outside a transform's domain).
    excluded: Vec<NaiveDateTime>,
}

/// Flag column in [`ModelCandidate::model_dataset`]: 1 when no reading matched.
pub const MISSING_COLUMN: &str = "Missing";
/// Flag column in [`ModelCandidate::model_dataset`]: 1 when dropped from the fit.
pub const EXCLUDED_COLUMN: &str = "Excluded";

impl ModelCandidate {
    /// Fit `spec` on lab samples from `constituent_data` matched to readings
    /// in `surrogate_data` within `tolerance`.
    pub fn fit(
        constituent_data: &Table,
        surrogate_data: Arc<Table>,
        spec: ModelSpec,
        tolerance: Duration,
        regression: &dyn Regression,
    ) -> ModelCandidate {
        let mut candidate = ModelCandidate {
            spec,
            status: FitStatus::Failed(FitFailure::Other("not fit".to_string())),
            bias_correction: 1.0,
            samples: None,
            training: surrogate_data,
        };

        candidate.status = match candidate.try_fit(constituent_data, tolerance, regression) {
            Ok(fit) => {
                candidate.bias_correction =
                    bias_correction_factor(candidate.spec.constituent.transform, fit.residuals());
                debug!(
                    model = %candidate.spec.formula(),
                    n_obs = fit.n_obs(),
                    r2_adj = fit.r_squared_adj(),
                    p_value = fit.p_value(),
                    bcf = candidate.bias_correction,
                    "fit candidate"
                );
                if candidate.n_excluded() > 0 {
                    warn!(
                        model = %candidate.spec.formula(),
                        excluded = candidate.n_excluded(),
                        "dropped samples outside transform domain"
                    );
                }
                FitStatus::Fitted(fit)
            }
            Err(reason) => {
                warn!(model = %candidate.spec.formula(), %reason, "candidate failed to fit");
                FitStatus::Failed(reason)
            }
        };
        candidate
    }

    fn try_fit(
        &mut self,
        constituent_data: &Table,
        tolerance: Duration,
        regression: &dyn Regression,
    ) -> Result<Arc<dyn FittedRegression>, FitFailure> {
        let missing = |name: &str| FitFailure::Other(format!("missing column '{name}'"));

        let response = constituent_data
            .column(&self.spec.constituent.name)
            .ok_or_else(|| missing(&self.spec.constituent.name))?;
        let surrogates = self
            .spec
            .surrogates
            .iter()
            .map(|v| self.training.column(&v.name).ok_or_else(|| missing(&v.name)))
            .collect::<Result<Vec<_>, _>>()?;

        let matched = match_samples(&response, &surrogates, tolerance);

        let mut design = Design::new(self.spec.surrogates.len());
        let mut excluded = Vec::new();
        let mut offending: Option<&Variable> = None;
        for sample in &matched {
            let y = self.spec.constituent.transform.apply(sample.response);
            let row = self
                .spec
                .surrogates
                .iter()
                .zip(&sample.surrogates)
                .map(|(v, &x)| v.transform.apply(x))
                .collect::<Option<Vec<f64>>>();

            match (y, row) {
                (Some(y), Some(row)) => design.push(y, row),
                _ => {
                    excluded.push(sample.at);
                    if offending.is_none() {
                        offending = first_non_positive(&self.spec, sample);
                    }
                }
            }
        }

        self.samples = Some(CalibrationSamples {
            lab: response.present().collect(),
            matched,
            excluded,
        });

        regression.fit(&design).map_err(|e| match (e, offending) {
            (FitFailure::InsufficientSamples { .. }, Some(var)) => {
                FitFailure::NonPositiveUnderLogTransform {
                    variable: var.name.clone(),
                }
            }
            (e, _) => e,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn formula(&self) -> String {
        self.spec.formula()
    }

    pub fn status(&self) -> &FitStatus {
        &self.status
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.status, FitStatus::Fitted(_))
    }

    pub fn failure(&self) -> Option<&FitFailure> {
        match &self.status {
            FitStatus::Failed(reason) => Some(reason),
            FitStatus::Fitted(_) => None,
        }
    }

    fn fitted(&self) -> Option<&Arc<dyn FittedRegression>> {
        match &self.status {
            FitStatus::Fitted(fit) => Some(fit),
            FitStatus::Failed(_) => None,
        }
    }

    pub fn n_obs(&self) -> Option<usize> {
        self.fitted().map(|f| f.n_obs())
    }

    pub fn p_value(&self) -> Option<f64> {
        self.fitted().map(|f| f.p_value())
    }

    pub fn r_squared_adj(&self) -> Option<f64> {
        self.fitted().map(|f| f.r_squared_adj())
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted().map(|f| f.coefficients())
    }

    /// Samples matched to surrogate readings before transform screening.
    pub fn n_matched(&self) -> usize {
        self.samples.as_ref().map_or(0, |s| s.matched.len())
    }

    /// Matched samples dropped from the fit.
    pub fn n_excluded(&self) -> usize {
        self.samples.as_ref().map_or(0, |s| s.excluded.len())
    }

    /// Calibration dataset in native units, one row per present lab sample.
    ///
    /// Columns are the constituent, each surrogate reading matched to the
    /// sample (empty when unmatched), then [`MISSING_COLUMN`] and
    /// [`EXCLUDED_COLUMN`] as 0/1 flags. `None` if the candidate failed
    /// before samples were matched.
    pub fn model_dataset(&self) -> Option<Table> {
        let samples = self.samples.as_ref()?;
        let index: Vec<NaiveDateTime> = samples.lab.iter().map(|(at, _)| *at).collect();
        let flag = |set: bool| Some(if set { 1.0 } else { 0.0 });

        let mut readings = vec![Vec::with_capacity(index.len()); self.spec.surrogates.len()];
        let mut missing = Vec::with_capacity(index.len());
        let mut excluded = Vec::with_capacity(index.len());
        let mut matched = samples.matched.iter().peekable();
        for at in &index {
            let sample = matched.next_if(|m| m.at == *at);
            for (column, i) in readings.iter_mut().zip(0..) {
                column.push(sample.map(|m| m.surrogates[i]));
            }
            missing.push(flag(sample.is_none()));
            excluded.push(flag(samples.excluded.contains(at)));
        }

        let mut columns = vec![(
            self.spec.constituent.name.clone(),
            samples.lab.iter().map(|(_, v)| Some(*v)).collect(),
        )];
        columns.extend(
            self.spec
                .surrogates
                .iter()
                .map(|v| v.name.clone())
                .zip(readings),
        );
        columns.push((MISSING_COLUMN.to_string(), missing));
        columns.push((EXCLUDED_COLUMN.to_string(), excluded));
        Some(Table::from_validated(index, columns))
    }

    /// Multiplicative back-transformation bias correction (1 for untransformed responses).
    pub fn bias_correction_factor(&self) -> f64 {
        self.bias_correction
    }

    /// Surrogate table the candidate was fit against.
    pub fn training_data(&self) -> &Table {
        &self.training
    }

    /// Predict the constituent in native units for every row of `explanatory`.
    ///
    /// Rows with a missing surrogate, or a surrogate outside its transform's
    /// domain, produce a missing prediction.
    pub fn predict(&self, explanatory: &Table) -> Result<PredictionSeries, QwError> {
        let fit = self.fitted().ok_or_else(|| QwError::NotFitted {
            formula: self.formula(),
        })?;

        let columns = self
            .spec
            .surrogates
            .iter()
            .map(|v| {
                explanatory
                    .values(&v.name)
                    .map(|values| (v.transform, values))
                    .ok_or_else(|| QwError::MissingColumn(v.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = (0..explanatory.len())
            .map(|i| {
                let row = columns
                    .iter()
                    .map(|(transform, values)| values[i].and_then(|x| transform.apply(x)))
                    .collect::<Option<Vec<f64>>>()?;
                Some(self.back_transform(fit.predict(&row)))
            })
            .collect();

        PredictionSeries::new(
            self.spec.constituent.name.clone(),
            explanatory.timestamps().to_vec(),
            rows,
        )
    }

    /// Predict over the candidate's own training surrogate data.
    pub fn predict_training(&self) -> Result<PredictionSeries, QwError> {
        self.predict(&self.training)
    }

    fn back_transform(&self, e: IntervalEstimate) -> PredictionRow {
        let t = self.spec.constituent.transform;
        PredictionRow {
            estimate: t.invert(e.estimate) * self.bias_correction,
            lower: t.invert(e.lower) * self.bias_correction,
            upper: t.invert(e.upper) * self.bias_correction,
        }
    }
}

fn bias_correction_factor(transform: Transform, residuals: &[f64]) -> f64 {
    match transform {
        Transform::Identity => 1.0,
        t => duan_smearing(residuals, |e| t.invert(e)),
    }
}

/// First log-transformed variable holding a non-positive value in `sample`.
fn first_non_positive<'a>(spec: &'a ModelSpec, sample: &MatchedSample) -> Option<&'a Variable> {
    let non_positive = |v: &Variable, x: f64| v.transform.requires_positive() && x <= 0.0;
    if non_positive(&spec.constituent, sample.response) {
        return Some(&spec.constituent);
    }
    spec.surrogates
        .iter()
        .zip(&sample.surrogates)
        .find(|(v, x)| non_positive(v, **x))
        .map(|(v, _)| v)
}
