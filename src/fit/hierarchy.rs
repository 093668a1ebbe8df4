//! Hierarchical selection and merging of candidate predictions.
//!
//! Fitted candidates are ranked by adjusted r² (worst first) and visited in
//! that order. Each candidate that passes the thresholds is predicted and
//! overlaid onto the running composite: present values replace whatever is
//! already there, so the best qualifying model wins wherever it can predict
//! and weaker models survive only in its gaps.
//!
//! Candidates failing a threshold are skipped outright and never contribute,
//! not even to gaps.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::domain::series::{reindex, union_index};
use crate::domain::{Table, Thresholds};
use crate::error::QwError;
use crate::models::{ModelCandidate, PredictionRow, PredictionSeries};

/// Merged prediction plus per-row provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePrediction {
    pub prediction: PredictionSeries,
    /// Index into the candidate list of the candidate that supplied each row.
    pub sources: Vec<Option<usize>>,
    /// Qualifying candidates in merge order (worst first).
    pub contributors: Vec<usize>,
}

impl CompositePrediction {
    /// Number of rows supplied by candidate `index`.
    pub fn rows_from(&self, index: usize) -> usize {
        self.sources.iter().filter(|s| **s == Some(index)).count()
    }
}

/// Whether a fitted candidate passes the selection thresholds.
///
/// Failed candidates never qualify.
pub fn qualifies(candidate: &ModelCandidate, thresholds: &Thresholds) -> bool {
    match (
        candidate.n_obs(),
        candidate.p_value(),
        candidate.r_squared_adj(),
    ) {
        (Some(n), Some(p), Some(r2)) => {
            n >= thresholds.min_samples && p <= thresholds.max_p_value && r2 > 0.0
        }
        _ => false,
    }
}

/// Indices of fitted candidates ordered worst to best by adjusted r².
///
/// The sort is stable: on equal r² candidates keep their listed order, so the
/// later-listed one is merged last and wins.
pub fn rank_candidates(candidates: &[ModelCandidate]) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.r_squared_adj().map(|r2| (i, r2)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().map(|(i, _)| i).collect()
}

/// Rank, filter and merge candidates into one composite prediction.
///
/// `explanatory` is the surrogate table to predict over. When `None`, each
/// candidate predicts over the surrogate data it was trained against.
pub fn select_and_merge(
    candidates: &[ModelCandidate],
    thresholds: &Thresholds,
    explanatory: Option<&Table>,
) -> Result<CompositePrediction, QwError> {
    let mut composite: Option<Composite> = None;
    let mut contributors = Vec::new();

    for i in rank_candidates(candidates) {
        let candidate = &candidates[i];
        if !qualifies(candidate, thresholds) {
            debug!(model = %candidate.formula(), "candidate below thresholds; skipped");
            continue;
        }

        let data = explanatory.unwrap_or_else(|| candidate.training_data());
        let prediction = candidate.predict(data)?;
        debug!(
            model = %candidate.formula(),
            r2_adj = candidate.r_squared_adj(),
            predicted = prediction.count_present(),
            "merging candidate"
        );

        composite = Some(match composite {
            None => Composite::from_prediction(&prediction, i),
            Some(c) => c.overlay(&prediction, i),
        });
        contributors.push(i);
    }

    let constituent = candidates
        .first()
        .map(|c| c.spec().constituent.name.clone())
        .unwrap_or_default();

    let Some(composite) = composite else {
        return Err(QwError::NoQualifyingModel { constituent });
    };

    let prediction = PredictionSeries::new(&constituent, composite.timestamps, composite.rows)?;
    info!(
        constituent = %constituent,
        models = contributors.len(),
        rows = prediction.len(),
        predicted = prediction.count_present(),
        "merged hierarchical prediction"
    );

    Ok(CompositePrediction {
        prediction,
        sources: composite.sources,
        contributors,
    })
}

struct Composite {
    timestamps: Vec<NaiveDateTime>,
    rows: Vec<Option<PredictionRow>>,
    sources: Vec<Option<usize>>,
}

impl Composite {
    fn from_prediction(prediction: &PredictionSeries, index: usize) -> Self {
        Self {
            timestamps: prediction.timestamps().to_vec(),
            rows: prediction.rows().to_vec(),
            sources: prediction.rows().iter().map(|r| r.map(|_| index)).collect(),
        }
    }

    /// Present rows of `prediction` replace the composite's rows.
    fn overlay(self, prediction: &PredictionSeries, index: usize) -> Self {
        let timestamps = union_index(&self.timestamps, prediction.timestamps());
        let mut rows = reindex(&self.timestamps, &self.rows, &timestamps);
        let mut sources = reindex(&self.timestamps, &self.sources, &timestamps);
        let incoming = reindex(prediction.timestamps(), prediction.rows(), &timestamps);

        for ((row, source), new) in rows.iter_mut().zip(sources.iter_mut()).zip(incoming) {
            if new.is_some() {
                *row = new;
                *source = Some(index);
            }
        }

        Self {
            timestamps,
            rows,
            sources,
        }
    }
}
