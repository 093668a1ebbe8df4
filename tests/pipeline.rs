//! End-to-end runs over in-memory and on-disk stores.

use approx::assert_relative_eq;

use qw_loads::app::pipeline::{fit_constituent, load_site, load_table, YearlyMethod};
use qw_loads::app::{demo_project, demo_store, DEMO_SITE};
use qw_loads::data::synthetic::SyntheticConfig;
use qw_loads::domain::{ProjectConfig, SiteConfig};
use qw_loads::error::{AppError, QwError};
use qw_loads::io::export::write_table_csv;
use qw_loads::io::store::{CsvStore, SeriesStore, Stream};
use qw_loads::report::{summarize, Period};

fn project_with_missing_site() -> ProjectConfig {
    let mut project = demo_project();
    project.sites.push(SiteConfig {
        id: "00000000".to_string(),
        name: None,
        proxies: Default::default(),
    });
    project
}

#[test]
fn hierarchical_tp_covers_orthop_outage() {
    let store = demo_store(&SyntheticConfig::default()).unwrap();
    let project = demo_project();
    let data = load_site(&store, &project.site(DEMO_SITE)).unwrap();
    let tp = project.constituent("TP").unwrap();

    let fit = fit_constituent(&data, tp, &project).unwrap();
    assert_eq!(fit.candidates.len(), 2);
    assert!(fit.candidates.iter().all(|c| c.is_fitted()));

    let composite = fit.composite.unwrap();
    assert_eq!(composite.contributors.len(), 2);
    // Turbidity never drops out, so the turbidity-only model covers every gap.
    assert_eq!(composite.prediction.count_present(), data.surrogates.len());

    let rows = summarize(&fit.candidates);
    assert_eq!(rows[0].model, "log10(TP) ~ log10(OrthoP) + log10(Turb_YSI)");
    assert!(rows.iter().all(|r| r.n_obs.unwrap() >= 10));
}

#[test]
fn unqualified_merge_keeps_typed_error_and_candidates() {
    let store = demo_store(&SyntheticConfig::default()).unwrap();
    let mut project = demo_project();
    project.thresholds.min_samples = 10_000;
    let data = load_site(&store, &project.site(DEMO_SITE)).unwrap();
    let tp = project.constituent("TP").unwrap();

    let fit = fit_constituent(&data, tp, &project).unwrap();
    assert_eq!(fit.candidates.len(), 2);
    let err = fit.composite.unwrap_err();
    assert!(matches!(&err, QwError::NoQualifyingModel { constituent } if constituent == "TP"));
    assert_eq!(AppError::from(err).exit_code(), 3);
}

#[test]
fn load_table_reports_missing_sites_without_aborting() {
    let store = demo_store(&SyntheticConfig::default()).unwrap();
    let project = project_with_missing_site();

    let table = load_table(&store, &project, &[], YearlyMethod::Mean).unwrap();
    assert_eq!(table.rows().len(), 1);
    assert_eq!(table.failures().len(), 1);
    assert_eq!(table.failures()[0].site, "00000000");

    for label in ["Nitrate (lbs-N)", "Phosphorus (lbs)", "SSC (tons)"] {
        let v = table.value(DEMO_SITE, label, Period::Record).unwrap();
        assert!(v > 0.0, "{label} load should be positive, got {v}");
    }
}

#[test]
fn water_year_mean_column_matches_single_year() {
    let store = demo_store(&SyntheticConfig::default()).unwrap();
    let project = demo_project();

    let table = load_table(&store, &project, &[2016], YearlyMethod::Mean).unwrap();
    assert_eq!(table.periods(), &[Period::WaterYear(2016), Period::Mean]);
    let year = table.value(DEMO_SITE, "SSC (tons)", Period::WaterYear(2016)).unwrap();
    let mean = table.value(DEMO_SITE, "SSC (tons)", Period::Mean).unwrap();
    assert_relative_eq!(year, mean, max_relative = 1e-12);

    // The synthetic record lies entirely in water year 2016.
    let empty = load_table(&store, &project, &[2014], YearlyMethod::Sum).unwrap();
    assert_eq!(empty.value(DEMO_SITE, "SSC (tons)", Period::WaterYear(2014)), None);
}

#[test]
fn csv_store_matches_memory_store() {
    let config = SyntheticConfig {
        days: 60,
        n_samples: 30,
        orthop_outage: None,
        ..SyntheticConfig::default()
    };
    let memory = demo_store(&config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = CsvStore::new(dir.path());
    for stream in [Stream::Iv, Stream::QwData] {
        let table = memory.get(DEMO_SITE, stream).unwrap();
        write_table_csv(&csv.path_for(DEMO_SITE, stream), &table).unwrap();
    }

    let project = project_with_missing_site();
    let from_memory = load_table(&memory, &project, &[], YearlyMethod::Mean).unwrap();
    let from_disk = load_table(&csv, &project, &[], YearlyMethod::Mean).unwrap();

    assert_eq!(from_disk.failures().len(), 1);
    for label in ["Nitrate (lbs-N)", "Phosphorus (lbs)", "SSC (tons)"] {
        let a = from_memory.value(DEMO_SITE, label, Period::Record).unwrap();
        let b = from_disk.value(DEMO_SITE, label, Period::Record).unwrap();
        assert_relative_eq!(a, b, max_relative = 1e-12);
    }
}
