//! Pair discrete lab samples with continuous sensor readings.

use chrono::{Duration, NaiveDateTime};

use crate::domain::TimeSeries;

/// One lab sample with the surrogate readings matched to it (native units).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedSample {
    pub at: NaiveDateTime,
    pub response: f64,
    /// One value per surrogate, in the order the surrogates were given.
    pub surrogates: Vec<f64>,
}

/// Match every present constituent sample to the nearest present reading of
/// each surrogate within `tolerance`.
///
/// Each surrogate is matched independently, so the readings for one sample
/// may come from different sensor timestamps. A sample lacking a match for
/// any surrogate is dropped.
pub fn match_samples(
    constituent: &TimeSeries,
    surrogates: &[TimeSeries],
    tolerance: Duration,
) -> Vec<MatchedSample> {
    constituent
        .present()
        .filter_map(|(at, response)| {
            let matched = surrogates
                .iter()
                .map(|s| s.nearest_within(at, tolerance).map(|(_, v)| v))
                .collect::<Option<Vec<f64>>>()?;
            Some(MatchedSample {
                at,
                response,
                surrogates: matched,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn drops_samples_outside_tolerance() {
        let lab = TimeSeries::new(
            "TP",
            vec![at(0, 10), at(5, 0), at(6, 0)],
            vec![Some(0.3), Some(0.4), None],
        )
        .unwrap();
        let turb = TimeSeries::new(
            "Turb",
            vec![at(0, 0), at(0, 15), at(6, 0)],
            vec![Some(10.0), Some(12.0), Some(20.0)],
        )
        .unwrap();

        let matched = match_samples(&lab, &[turb], Duration::minutes(30));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].at, at(0, 10));
        assert_eq!(matched[0].surrogates, vec![12.0]);
    }
}
