//! CSV ingest for site tables.
//!
//! A site table is a CSV whose first column holds the timestamp and whose
//! remaining columns are numeric readings. Headers may be parameter codes
//! (`00060`, `p00665`, ...) or column names; codes are translated through the
//! vocabulary in [`crate::io::codes`].
//!
//! Validation is row-level: a row with an unparseable timestamp or a repeated
//! timestamp is skipped, a cell that is not a number becomes missing, and each
//! problem is reported in [`IngestedTable::row_errors`].

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::Table;
use crate::error::QwError;
use crate::io::codes::column_name;

/// Accepted timestamp layouts, tried in order.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Columns that identify rather than measure; never read as values.
const NON_NUMERIC: [&str; 2] = ["Site", "DateTime"];

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: Table,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Read a site table from a CSV file.
pub fn read_table(path: &Path) -> Result<IngestedTable, QwError> {
    let file = File::open(path).map_err(|e| {
        QwError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open '{}': {e}", path.display()),
        ))
    })?;
    let ingested = read_table_from(file)?;
    if !ingested.row_errors.is_empty() {
        warn!(
            path = %path.display(),
            errors = ingested.row_errors.len(),
            "skipped or blanked malformed rows"
        );
    }
    Ok(ingested)
}

/// Read a site table from any CSV source.
pub fn read_table_from<R: Read>(reader: R) -> Result<IngestedTable, QwError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let value_columns = value_columns(&headers)?;

    let mut rows: Vec<(NaiveDateTime, Vec<Option<f64>>)> = Vec::new();
    let mut seen: HashSet<NaiveDateTime> = HashSet::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let raw_time = record.get(0).unwrap_or("");
        let Some(at) = parse_datetime(raw_time) else {
            row_errors.push(RowError {
                line,
                message: format!("unparseable timestamp '{raw_time}'"),
            });
            continue;
        };
        if !seen.insert(at) {
            row_errors.push(RowError {
                line,
                message: format!("duplicate timestamp {at}"),
            });
            continue;
        }

        let values = value_columns
            .iter()
            .map(|(idx, name)| {
                let cell = record.get(*idx).unwrap_or("");
                parse_cell(cell).unwrap_or_else(|| {
                    row_errors.push(RowError {
                        line,
                        message: format!("non-numeric value '{cell}' in column '{name}'"),
                    });
                    None
                })
            })
            .collect();
        rows.push((at, values));
    }

    rows.sort_by_key(|(at, _)| *at);
    let timestamps: Vec<NaiveDateTime> = rows.iter().map(|(at, _)| *at).collect();

    let mut table = Table::new(timestamps)?;
    for (col, (_, name)) in value_columns.iter().enumerate() {
        let values = rows.iter().map(|(_, v)| v[col]).collect();
        table.set_column(name.clone(), values)?;
    }
    debug!(rows = table.len(), columns = value_columns.len(), "ingested table");

    Ok(IngestedTable {
        table,
        row_errors,
        rows_read,
    })
}

/// `(record index, column name)` for every numeric column.
fn value_columns(headers: &StringRecord) -> Result<Vec<(usize, String)>, QwError> {
    if headers.is_empty() {
        return Err(QwError::InvalidSeries("CSV has no header row".to_string()));
    }

    let mut out: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in headers.iter().enumerate().skip(1) {
        // Spreadsheet exports sometimes prefix the header with a BOM.
        let name = column_name(raw.trim().trim_start_matches('\u{feff}'));
        if name.is_empty() || NON_NUMERIC.contains(&name) {
            continue;
        }
        if out.iter().any(|(_, n)| n == name) {
            return Err(QwError::InvalidSeries(format!("duplicate column '{name}'")));
        }
        out.push((idx, name.to_string()));
    }
    Ok(out)
}

/// `Some(None)` for an empty cell, `None` for a cell that is not a number.
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
}
