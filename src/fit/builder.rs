//! Candidate-set construction.
//!
//! Given an ordered list of model specs for one constituent, fit one
//! [`ModelCandidate`] per spec. Configuration problems (specs that disagree
//! on the raw constituent) fail the whole batch before anything is fit;
//! problems with an individual fit are recorded on that candidate only.

use std::sync::Arc;

use chrono::Duration;
use rayon::prelude::*;
use tracing::info;

use crate::domain::{ModelSpec, Table};
use crate::error::QwError;
use crate::models::{ModelCandidate, Ols, Regression};

/// The single raw constituent shared by every spec in the batch.
pub fn required_constituent(specs: &[ModelSpec]) -> Result<String, QwError> {
    let Some(first) = specs.first() else {
        return Err(QwError::EmptyModelList);
    };

    let mut found: Vec<String> = vec![first.constituent.name.clone()];
    for spec in &specs[1..] {
        if !found.contains(&spec.constituent.name) {
            found.push(spec.constituent.name.clone());
        }
    }

    if found.len() != 1 {
        return Err(QwError::AmbiguousConstituent { found });
    }
    Ok(first.constituent.name.clone())
}

/// Fit every spec with the default OLS backend.
pub fn build_candidates(
    specs: &[ModelSpec],
    constituent_data: &Table,
    surrogate_data: &Table,
    tolerance: Duration,
) -> Result<Vec<ModelCandidate>, QwError> {
    build_candidates_with(specs, constituent_data, surrogate_data, tolerance, &Ols::default())
}

/// Fit every spec with the given regression backend.
///
/// Candidates are returned in spec order. Fits run in parallel; they share the
/// input tables read-only.
pub fn build_candidates_with(
    specs: &[ModelSpec],
    constituent_data: &Table,
    surrogate_data: &Table,
    tolerance: Duration,
    regression: &dyn Regression,
) -> Result<Vec<ModelCandidate>, QwError> {
    let constituent = required_constituent(specs)?;
    let surrogate_data = Arc::new(surrogate_data.clone());

    let candidates: Vec<ModelCandidate> = specs
        .par_iter()
        .map(|spec| {
            ModelCandidate::fit(
                constituent_data,
                Arc::clone(&surrogate_data),
                spec.deduplicated(),
                tolerance,
                regression,
            )
        })
        .collect();

    let fitted = candidates.iter().filter(|c| c.is_fitted()).count();
    info!(
        constituent = %constituent,
        specs = specs.len(),
        fitted,
        failed = specs.len() - fitted,
        "built candidate set"
    );

    Ok(candidates)
}
