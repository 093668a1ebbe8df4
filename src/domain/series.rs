//! Time-indexed data: a single named [`TimeSeries`] and a multi-column [`Table`].
//!
//! Both keep timestamps strictly increasing and represent gaps as `None`
//! rather than a sentinel number. Binary operations align on the union of
//! the two indexes; a timestamp missing from either side yields `None`.

use chrono::{Duration, NaiveDateTime};

use crate::error::QwError;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<Option<f64>>,
    ) -> Result<Self, QwError> {
        let name = name.into();
        if timestamps.len() != values.len() {
            return Err(QwError::InvalidSeries(format!(
                "'{name}' has {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        ensure_increasing(&name, &timestamps)?;
        ensure_finite(&name, &timestamps, &values)?;
        Ok(Self {
            name,
            timestamps,
            values,
        })
    }

    /// Construct from an index already known to be strictly increasing.
    pub(crate) fn from_validated(
        name: impl Into<String>,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<Option<f64>>,
    ) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self {
            name: name.into(),
            timestamps,
            values,
        }
    }

    pub fn from_points(
        name: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDateTime, Option<f64>)>,
    ) -> Result<Self, QwError> {
        let (timestamps, values) = points.into_iter().unzip();
        Self::new(name, timestamps, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
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

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, Option<f64>)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Non-missing points only.
    pub fn present(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.iter().filter_map(|(t, v)| v.map(|v| (t, v)))
    }

    pub fn count_present(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Value stored exactly at `at`, if any.
    pub fn get(&self, at: NaiveDateTime) -> Option<f64> {
        self.timestamps
            .binary_search(&at)
            .ok()
            .and_then(|i| self.values[i])
    }

    /// Nearest non-missing observation within `tolerance` of `at`.
    ///
    /// When two observations are equally distant the earlier one wins.
    pub fn nearest_within(
        &self,
        at: NaiveDateTime,
        tolerance: Duration,
    ) -> Option<(NaiveDateTime, f64)> {
        let split = self.timestamps.partition_point(|t| *t < at);

        let before = (0..split)
            .rev()
            .take_while(|&i| at - self.timestamps[i] <= tolerance)
            .find_map(|i| self.values[i].map(|v| (self.timestamps[i], v)));

        let after = (split..self.timestamps.len())
            .take_while(|&i| self.timestamps[i] - at <= tolerance)
            .find_map(|i| self.values[i].map(|v| (self.timestamps[i], v)));

        match (before, after) {
            (Some(b), Some(a)) => {
                if at - b.0 <= a.0 - at {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    /// Rows with `start <= t < end`.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> TimeSeries {
        let lo = self.timestamps.partition_point(|t| *t < start);
        let hi = self.timestamps.partition_point(|t| *t < end).max(lo);
        TimeSeries {
            name: self.name.clone(),
            timestamps: self.timestamps[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        }
    }

    /// Mean of the non-missing values, `None` when there are none.
    pub fn mean(&self) -> Option<f64> {
        let n = self.count_present();
        if n == 0 {
            return None;
        }
        Some(self.present().map(|(_, v)| v).sum::<f64>() / n as f64)
    }

    /// Sum of the non-missing values, `None` when there are none.
    pub fn sum(&self) -> Option<f64> {
        if self.count_present() == 0 {
            return None;
        }
        Some(self.present().map(|(_, v)| v).sum())
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> TimeSeries {
        TimeSeries {
            name: self.name.clone(),
            timestamps: self.timestamps.clone(),
            values: self.values.iter().map(|v| v.map(&f)).collect(),
        }
    }

    /// Combine two series point-wise over the union of their indexes.
    pub fn zip_with(
        &self,
        other: &TimeSeries,
        name: impl Into<String>,
        f: impl Fn(f64, f64) -> f64,
    ) -> TimeSeries {
        let index = union_index(&self.timestamps, &other.timestamps);
        let left = reindex(&self.timestamps, &self.values, &index);
        let right = reindex(&other.timestamps, &other.values, &index);
        let values = left
            .into_iter()
            .zip(right)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(f(a, b)),
                _ => None,
            })
            .collect();
        TimeSeries {
            name: name.into(),
            timestamps: index,
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Option<f64>>,
}

/// Named columns sharing one timestamp index.
///
/// Column order is insertion order, which is also the CSV output order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Result<Self, QwError> {
        ensure_increasing("table index", &timestamps)?;
        Ok(Self {
            timestamps,
            columns: Vec::new(),
        })
    }

    /// Construct from an index already known to be strictly increasing and
    /// columns of matching length.
    pub(crate) fn from_validated(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, values)| {
                    debug_assert_eq!(values.len(), timestamps.len());
                    Column { name, values }
                })
                .collect(),
            timestamps,
        }
    }

    /// Build a table from series, aligning them on the union of their indexes.
    pub fn from_series(series: &[TimeSeries]) -> Result<Self, QwError> {
        let mut index: Vec<NaiveDateTime> = Vec::new();
        for s in series {
            index = union_index(&index, &s.timestamps);
        }
        let mut table = Table::new(index)?;
        for s in series {
            let values = reindex(&s.timestamps, &s.values, &table.timestamps);
            table.set_column(s.name.clone(), values)?;
        }
        Ok(table)
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

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column(&self, name: &str) -> Option<TimeSeries> {
        self.values(name).map(|values| TimeSeries {
            name: name.to_string(),
            timestamps: self.timestamps.clone(),
            values: values.to_vec(),
        })
    }

    /// Like [`Table::column`] but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<TimeSeries, QwError> {
        self.column(name)
            .ok_or_else(|| QwError::MissingColumn(name.to_string()))
    }

    /// Insert a column, replacing any existing column of the same name.
    ///
    /// Present values must be finite; gaps are `None`.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), QwError> {
        let name = name.into();
        if values.len() != self.timestamps.len() {
            return Err(QwError::InvalidSeries(format!(
                "column '{name}' has {} values for an index of {}",
                values.len(),
                self.timestamps.len()
            )));
        }
        ensure_finite(&name, &self.timestamps, &values)?;
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == from) {
            col.name = to.to_string();
        }
    }

    /// Subset of columns, silently skipping names that are absent.
    pub fn select(&self, names: &[&str]) -> Table {
        Table {
            timestamps: self.timestamps.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| names.contains(&c.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Gap-only merge: the result spans both indexes and all columns; values
    /// already present in `self` are kept, missing ones are taken from `other`.
    pub fn update_merge(&self, other: &Table) -> Table {
        self.combine(other, false)
    }

    /// Like [`Table::update_merge`], but present values in `other` win.
    pub fn overlay(&self, other: &Table) -> Table {
        self.combine(other, true)
    }

    fn combine(&self, other: &Table, overwrite: bool) -> Table {
        let index = union_index(&self.timestamps, &other.timestamps);
        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: reindex(&self.timestamps, &c.values, &index),
            })
            .collect();

        for oc in &other.columns {
            let incoming = reindex(&other.timestamps, &oc.values, &index);
            match columns.iter_mut().find(|c| c.name == oc.name) {
                Some(col) => {
                    for (slot, value) in col.values.iter_mut().zip(incoming) {
                        if value.is_some() && (overwrite || slot.is_none()) {
                            *slot = value;
                        }
                    }
                }
                None => columns.push(Column {
                    name: oc.name.clone(),
                    values: incoming,
                }),
            }
        }

        Table {
            timestamps: index,
            columns,
        }
    }

    /// Rows as `(timestamp, values-in-column-order)`.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDateTime, Vec<Option<f64>>)> + '_ {
        self.timestamps
            .iter()
            .enumerate()
            .map(|(i, &t)| (t, self.columns.iter().map(|c| c.values[i]).collect()))
    }
}

fn ensure_increasing(name: &str, timestamps: &[NaiveDateTime]) -> Result<(), QwError> {
    if let Some(w) = timestamps.windows(2).find(|w| w[0] >= w[1]) {
        return Err(QwError::InvalidSeries(format!(
            "'{name}' timestamps not strictly increasing at {}",
            w[1]
        )));
    }
    Ok(())
}

fn ensure_finite(
    name: &str,
    timestamps: &[NaiveDateTime],
    values: &[Option<f64>],
) -> Result<(), QwError> {
    if let Some((at, v)) = timestamps
        .iter()
        .zip(values)
        .find_map(|(at, v)| v.filter(|x| !x.is_finite()).map(|x| (at, x)))
    {
        return Err(QwError::InvalidSeries(format!(
            "'{name}' has non-finite value {v} at {at}; use a gap instead"
        )));
    }
    Ok(())
}

/// Sorted union of two strictly increasing indexes.
pub(crate) fn union_index(a: &[NaiveDateTime], b: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Project `values` (indexed by `from`) onto `to`; both must be increasing.
pub(crate) fn reindex<T: Copy>(
    from: &[NaiveDateTime],
    values: &[Option<T>],
    to: &[NaiveDateTime],
) -> Vec<Option<T>> {
    let mut out = Vec::with_capacity(to.len());
    let mut i = 0;
    for t in to {
        while i < from.len() && from[i] < *t {
            i += 1;
        }
        if i < from.len() && from[i] == *t {
            out.push(values[i]);
        } else {
            out.push(None);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn rejects_unsorted_index() {
        let err = TimeSeries::new("Q", vec![ts(1, 0), ts(0, 45)], vec![Some(1.0), Some(2.0)]);
        assert!(matches!(err, Err(QwError::InvalidSeries(_))));
    }

    #[test]
    fn rejects_non_finite_values() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let series = TimeSeries::new("Turb", vec![ts(0, 0), ts(0, 15)], vec![Some(1.0), Some(bad)]);
            assert!(matches!(series, Err(QwError::InvalidSeries(_))));

            let mut table = Table::new(vec![ts(0, 0), ts(0, 15)]).unwrap();
            let column = table.set_column("Turb", vec![Some(bad), None]);
            assert!(matches!(column, Err(QwError::InvalidSeries(_))));
            assert!(!table.has_column("Turb"));
        }
    }

    #[test]
    fn nearest_skips_missing_and_respects_tolerance() {
        let s = TimeSeries::new(
            "Turb",
            vec![ts(0, 0), ts(0, 15), ts(0, 30), ts(1, 30)],
            vec![Some(1.0), None, Some(3.0), Some(4.0)],
        )
        .unwrap();

        // 00:17 is closest to the missing 00:15 row; 00:30 is the nearest present value.
        assert_eq!(s.nearest_within(ts(0, 17), Duration::minutes(30)), Some((ts(0, 30), 3.0)));
        // Equidistant: earlier wins.
        assert_eq!(s.nearest_within(ts(1, 0), Duration::minutes(30)), Some((ts(0, 30), 3.0)));
        assert_eq!(s.nearest_within(ts(3, 0), Duration::minutes(30)), None);
    }

    #[test]
    fn update_merge_only_fills_gaps() {
        let mut a = Table::new(vec![ts(0, 0), ts(0, 15)]).unwrap();
        a.set_column("Discharge", vec![Some(10.0), None]).unwrap();
        let mut b = Table::new(vec![ts(0, 0), ts(0, 15), ts(0, 30)]).unwrap();
        b.set_column("Discharge", vec![Some(99.0), Some(11.0), Some(12.0)])
            .unwrap();

        let merged = a.update_merge(&b);
        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged.values("Discharge").unwrap(),
            &[Some(10.0), Some(11.0), Some(12.0)]
        );
    }

    #[test]
    fn overlay_prefers_incoming_values() {
        let mut a = Table::new(vec![ts(0, 0), ts(0, 15)]).unwrap();
        a.set_column("TP", vec![Some(1.0), Some(2.0)]).unwrap();
        let mut b = Table::new(vec![ts(0, 15)]).unwrap();
        b.set_column("TP", vec![Some(5.0)]).unwrap();
        b.set_column("TP_L90", vec![Some(4.0)]).unwrap();

        let out = a.overlay(&b);
        assert_eq!(out.values("TP").unwrap(), &[Some(1.0), Some(5.0)]);
        assert_eq!(out.values("TP_L90").unwrap(), &[None, Some(4.0)]);
    }

    #[test]
    fn zip_with_aligns_on_union() {
        let a = TimeSeries::new("a", vec![ts(0, 0), ts(0, 15)], vec![Some(2.0), Some(3.0)]).unwrap();
        let b = TimeSeries::new("b", vec![ts(0, 15), ts(0, 30)], vec![Some(4.0), Some(5.0)]).unwrap();
        let c = a.zip_with(&b, "c", |x, y| x * y);
        assert_eq!(c.timestamps(), &[ts(0, 0), ts(0, 15), ts(0, 30)]);
        assert_eq!(c.values(), &[None, Some(12.0), None]);
    }

    #[test]
    fn between_is_half_open() {
        let s = TimeSeries::new(
            "x",
            vec![ts(0, 0), ts(0, 15), ts(0, 30)],
            vec![Some(1.0), Some(2.0), Some(3.0)],
        )
        .unwrap();
        let w = s.between(ts(0, 15), ts(0, 30));
        assert_eq!(w.values(), &[Some(2.0)]);
        assert!(s.between(ts(2, 0), ts(3, 0)).is_empty());
    }
}
