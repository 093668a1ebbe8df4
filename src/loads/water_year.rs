//! Water-year accounting windows.
//!
//! Water year `Y` runs from Oct 1 of `Y - 1` through Sep 30 of `Y`. Windows are
//! half-open on midnight of Oct 1, so every reading on Sep 30 belongs to `Y`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error::QwError;

const FIRST_MONTH: u32 = 10;

/// Half-open `[start, end)` timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

fn october_first(year: i32) -> Result<NaiveDateTime, QwError> {
    NaiveDate::from_ymd_opt(year, FIRST_MONTH, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| QwError::Config(format!("water year {} out of range", year + 1)))
}

/// Window covering a single water year.
pub fn water_year_window(water_year: i32) -> Result<Window, QwError> {
    water_year_span(water_year, water_year)
}

/// Window covering water years `first..=last`.
pub fn water_year_span(first: i32, last: i32) -> Result<Window, QwError> {
    if last < first {
        return Err(QwError::Config(format!(
            "water-year span {first}..{last} is empty"
        )));
    }
    Ok(Window {
        start: october_first(first - 1)?,
        end: october_first(last)?,
    })
}

/// Water year a timestamp falls in.
pub fn water_year_of(at: NaiveDateTime) -> i32 {
    if at.month() >= FIRST_MONTH {
        at.year() + 1
    } else {
        at.year()
    }
}
