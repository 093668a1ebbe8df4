//! Per-site pipeline shared by every subcommand.
//!
//! site data (+ proxies) -> candidate set -> hierarchical merge -> concentration
//! series -> loads
//!
//! Commands differ only in which of these outputs they print or export.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::domain::{
    match_tolerance, ConcentrationSource, ConstituentConfig, ProjectConfig, SiteConfig, Table,
    TimeSeries,
};
use crate::error::QwError;
use crate::fit::{build_candidates, select_and_merge, CompositePrediction};
use crate::io::store::{get_with_proxies, SeriesStore, Stream};
use crate::loads::{annual_load, mean_annual_load, mean_annual_load_span};
use crate::models::ModelCandidate;
use crate::report::{LoadTable, Period};

pub const DISCHARGE_COLUMN: &str = "Discharge";

/// Both tables for one site, proxies applied.
#[derive(Debug, Clone)]
pub struct SiteData {
    pub site: SiteConfig,
    pub surrogates: Table,
    /// Absent when the store has no lab samples for the site.
    pub constituents: Option<Table>,
}

/// Candidates and (when one qualified) the merged prediction.
#[derive(Debug)]
pub struct ConstituentFit {
    pub candidates: Vec<ModelCandidate>,
    pub composite: Result<CompositePrediction, QwError>,
}

/// Estimator for per-water-year load columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearlyMethod {
    /// Mean interval flux scaled to a year; tolerant of gaps.
    #[default]
    Mean,
    /// Summed flux; only a true total for complete records.
    Sum,
}

pub fn load_site(store: &dyn SeriesStore, site: &SiteConfig) -> Result<SiteData, QwError> {
    let surrogates = get_with_proxies(store, site, Stream::Iv)?;
    let constituents = match get_with_proxies(store, site, Stream::QwData) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(site = %site.id, error = %e, "no lab samples for site");
            None
        }
    };
    info!(
        site = %site.id,
        readings = surrogates.len(),
        samples = constituents.as_ref().map_or(0, Table::len),
        "loaded site"
    );
    Ok(SiteData {
        site: site.clone(),
        surrogates,
        constituents,
    })
}

impl SiteData {
    fn lab_samples(&self) -> Result<&Table, QwError> {
        self.constituents.as_ref().ok_or_else(|| QwError::SiteData {
            site: self.site.id.clone(),
            message: "no lab samples".to_string(),
        })
    }

    pub fn discharge(&self) -> Result<TimeSeries, QwError> {
        self.surrogates.require(DISCHARGE_COLUMN)
    }
}

/// Fit every model of a hierarchical constituent and merge what qualifies.
///
/// Configuration errors (bad expressions, mixed constituents) and missing lab
/// data are returned as errors. A merge with no qualifying model is not: the
/// candidates are still worth reporting, so the failure is kept on the result.
pub fn fit_constituent(
    data: &SiteData,
    constituent: &ConstituentConfig,
    project: &ProjectConfig,
) -> Result<ConstituentFit, QwError> {
    let specs = match constituent.source()? {
        ConcentrationSource::Hierarchical(specs) => specs,
        ConcentrationSource::Probe(column) => {
            return Err(QwError::Config(format!(
                "constituent '{}' is measured by probe '{column}' and has no models",
                constituent.name
            )));
        }
    };

    let candidates = build_candidates(
        &specs,
        data.lab_samples()?,
        &data.surrogates,
        match_tolerance(project.match_time_minutes),
    )?;
    let composite = select_and_merge(&candidates, &project.thresholds, Some(&data.surrogates));

    Ok(ConstituentFit {
        candidates,
        composite,
    })
}

/// Native-unit concentration series for a constituent at a site.
pub fn concentration(
    data: &SiteData,
    constituent: &ConstituentConfig,
    project: &ProjectConfig,
) -> Result<TimeSeries, QwError> {
    match constituent.source()? {
        ConcentrationSource::Probe(column) => {
            Ok(data.surrogates.require(&column)?.renamed(&constituent.name))
        }
        ConcentrationSource::Hierarchical(specs) => {
            let candidates = build_candidates(
                &specs,
                data.lab_samples()?,
                &data.surrogates,
                match_tolerance(project.match_time_minutes),
            )?;
            let composite =
                select_and_merge(&candidates, &project.thresholds, Some(&data.surrogates))?;
            Ok(composite.prediction.estimate())
        }
    }
}

/// Load values for one constituent, one per period.
pub fn constituent_loads(
    discharge: &TimeSeries,
    concentration: &TimeSeries,
    constituent: &ConstituentConfig,
    periods: &[Period],
    method: YearlyMethod,
) -> Result<Vec<Option<f64>>, QwError> {
    let years: Vec<i32> = periods
        .iter()
        .filter_map(|p| match p {
            Period::WaterYear(wy) => Some(*wy),
            _ => None,
        })
        .collect();

    periods
        .iter()
        .map(|period| match *period {
            Period::Record => mean_annual_load(discharge, concentration, constituent.units, None),
            Period::WaterYear(wy) => match method {
                YearlyMethod::Mean => {
                    mean_annual_load(discharge, concentration, constituent.units, Some(wy))
                }
                YearlyMethod::Sum => annual_load(wy, discharge, concentration, constituent.units),
            },
            Period::Mean => match (years.iter().min(), years.iter().max()) {
                (Some(&first), Some(&last)) => {
                    mean_annual_load_span(discharge, concentration, constituent.units, first, last)
                }
                _ => mean_annual_load(discharge, concentration, constituent.units, None),
            },
        })
        .collect()
}

/// Load table for every configured site.
///
/// A site whose data cannot be read, or a constituent that cannot be estimated
/// at a site, is recorded as a failure and the run continues.
pub fn load_table(
    store: &dyn SeriesStore,
    project: &ProjectConfig,
    water_years: &[i32],
    method: YearlyMethod,
) -> Result<LoadTable, QwError> {
    let labels = project.constituents.iter().map(|c| c.label.clone()).collect();
    let mut table = LoadTable::new(labels, water_years);
    let periods = table.periods().to_vec();

    for site in &project.sites {
        let data = match load_site(store, site) {
            Ok(d) => d,
            Err(e) => {
                warn!(site = %site.id, error = %e, "skipping site");
                table.push_failure(&site.id, None, e.to_string());
                continue;
            }
        };
        let discharge = match data.discharge() {
            Ok(q) => q,
            Err(e) => {
                warn!(site = %site.id, error = %e, "skipping site");
                table.push_failure(&site.id, None, e.to_string());
                continue;
            }
        };

        let mut values = Vec::with_capacity(project.constituents.len() * periods.len());
        for constituent in &project.constituents {
            let loads = concentration(&data, constituent, project).and_then(|c| {
                constituent_loads(&discharge, &c, constituent, &periods, method)
            });
            match loads {
                Ok(v) => values.extend(v),
                Err(e) => {
                    warn!(site = %site.id, constituent = %constituent.name, error = %e, "no load");
                    table.push_failure(&site.id, Some(constituent.name.clone()), e.to_string());
                    values.extend(std::iter::repeat_n(None, periods.len()));
                }
            }
        }
        table.push_row(&site.id, values)?;
    }

    info!(
        sites = table.rows().len(),
        failures = table.failures().len(),
        "computed load table"
    );
    Ok(table)
}

/// Time span covered by a table, for log lines and headers.
pub fn span(table: &Table) -> Option<(NaiveDateTime, NaiveDateTime)> {
    Some((*table.timestamps().first()?, *table.timestamps().last()?))
}
