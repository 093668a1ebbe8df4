//! File exports: model data, calibration samples, summaries, load tables.
//!
//! Everything is written as CSV (plus an optional JSON summary) so results
//! open directly in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::Table;
use crate::error::QwError;
use crate::report::{LoadTable, SummaryRow, SUMMARY_COLUMNS};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `<dir>/model_data/<site>_<constituent>.csv`
pub fn model_data_path(dir: &Path, site: &str, constituent: &str) -> PathBuf {
    dir.join("model_data").join(format!("{site}_{constituent}.csv"))
}

/// `<dir>/model_data/<site>_<constituent>_model<n>_samples.csv`, `n` counting
/// candidates from 1 in listed order.
pub fn samples_path(dir: &Path, site: &str, constituent: &str, n: usize) -> PathBuf {
    dir.join("model_data")
        .join(format!("{site}_{constituent}_model{n}_samples.csv"))
}

/// `<dir>/report/<site>_<constituent>_summary.<ext>`
pub fn summary_path(dir: &Path, site: &str, constituent: &str, ext: &str) -> PathBuf {
    dir.join("report")
        .join(format!("{site}_{constituent}_summary.{ext}"))
}

fn create(path: &Path) -> Result<File, QwError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    File::create(path).map_err(|e| {
        QwError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create '{}': {e}", path.display()),
        ))
    })
}

fn cell(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Write a table with a leading `datetime` column; missing values are empty cells.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), QwError> {
    let mut writer = csv::Writer::from_writer(create(path)?);

    let mut header = vec!["datetime".to_string()];
    header.extend(table.column_names().map(str::to_string));
    writer.write_record(&header)?;

    for (at, values) in table.rows() {
        let mut record = vec![at.format(TIMESTAMP_FORMAT).to_string()];
        record.extend(values.into_iter().map(cell));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.len(), "wrote table");
    Ok(())
}

/// Columns `model,# obs,adjusted r^2,p-value`; failed fits leave the statistics empty.
pub fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<(), QwError> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record(SUMMARY_COLUMNS)?;
    for r in rows {
        writer.write_record([
            r.model.clone(),
            r.n_obs.map(|n| n.to_string()).unwrap_or_default(),
            cell(r.r_squared_adj),
            cell(r.p_value),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json(path: &Path, rows: &[SummaryRow]) -> Result<(), QwError> {
    serde_json::to_writer_pretty(create(path)?, rows)?;
    Ok(())
}

/// Load table with a `Site ID` column followed by one column per header.
pub fn write_load_table_csv(path: &Path, table: &LoadTable) -> Result<(), QwError> {
    let mut writer = csv::Writer::from_writer(create(path)?);

    let mut header = vec!["Site ID".to_string()];
    header.extend(table.headers());
    writer.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![row.site.clone()];
        record.extend(row.values.iter().copied().map(cell));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), sites = table.rows().len(), "wrote load table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::read_table;
    use chrono::NaiveDate;

    #[test]
    fn table_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = NaiveDate::from_ymd_opt(2016, 2, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let mut table = Table::new(vec![t0, t0 + chrono::Duration::minutes(15)]).unwrap();
        table.set_column("Discharge", vec![Some(101.25), None]).unwrap();
        table.set_column("TP_L90", vec![Some(0.1), Some(0.2)]).unwrap();

        let path = model_data_path(dir.path(), "05586300", "TP");
        write_table_csv(&path, &table).unwrap();
        let back = read_table(&path).unwrap();

        assert!(back.row_errors.is_empty());
        assert_eq!(back.table, table);
    }

    #[test]
    fn summary_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            SummaryRow {
                model: "log10(SSC) ~ log10(Turb_YSI)".to_string(),
                n_obs: Some(24),
                r_squared_adj: Some(0.91),
                p_value: Some(1e-9),
                failure: None,
            },
            SummaryRow {
                model: "log10(SSC) ~ log10(Nope)".to_string(),
                n_obs: None,
                r_squared_adj: None,
                p_value: None,
                failure: Some("missing column 'Nope'".to_string()),
            },
        ];
        let path = summary_path(dir.path(), "05586300", "SSC", "csv");
        write_summary_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "model,# obs,adjusted r^2,p-value");
        assert_eq!(lines[1], "log10(SSC) ~ log10(Turb_YSI),24,0.91,0.000000001");
        assert_eq!(lines[2], "log10(SSC) ~ log10(Nope),,,");

        let json_path = summary_path(dir.path(), "05586300", "SSC", "json");
        write_summary_json(&json_path, &rows).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(parsed[0]["# obs"], 24);
        assert!(parsed[1]["p-value"].is_null());
    }

    #[test]
    fn calibration_samples_round_trip() {
        use crate::domain::ModelSpec;
        use crate::models::{ModelCandidate, Ols, EXCLUDED_COLUMN, MISSING_COLUMN};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let t0 = NaiveDate::from_ymd_opt(2016, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let index: Vec<_> = (0..8).map(|k| t0 + chrono::Duration::hours(k)).collect();
        let mut surrogates = Table::new(index.clone()).unwrap();
        surrogates
            .set_column("Turb_YSI", (0..8).map(|k| (k != 4).then(|| 10.0 + k as f64)).collect())
            .unwrap();
        let mut lab = Table::new(index).unwrap();
        lab.set_column("SSC", (0..8).map(|k| Some(2.5 * (10.0 + k as f64) + 0.25 * (k % 2) as f64)).collect())
            .unwrap();

        let candidate = ModelCandidate::fit(
            &lab,
            Arc::new(surrogates),
            ModelSpec::parse("SSC", &["Turb_YSI"]).unwrap(),
            chrono::Duration::minutes(10),
            &Ols::default(),
        );
        let dataset = candidate.model_dataset().unwrap();

        let path = samples_path(dir.path(), "05586300", "SSC", 1);
        assert!(path.ends_with("model_data/05586300_SSC_model1_samples.csv"));
        write_table_csv(&path, &dataset).unwrap();
        let back = read_table(&path).unwrap();

        assert!(back.row_errors.is_empty());
        assert_eq!(back.table, dataset);
        assert_eq!(back.table.values(MISSING_COLUMN).unwrap()[4], Some(1.0));
        assert_eq!(back.table.values(EXCLUDED_COLUMN).unwrap()[4], Some(0.0));
    }
}
