//! Synthetic monitoring-site data.
//!
//! Generates a continuous 15-minute surrogate record and sparse lab samples
//! whose constituents follow known log-linear surrogate relationships plus
//! lognormal noise. Used by the `demo` command and by tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Table;
use crate::error::QwError;

pub const SAMPLE_INTERVAL_MINUTES: i64 = 15;

/// True log10-space relationships used to generate the lab samples.
pub const TP_INTERCEPT: f64 = -0.6;
pub const TP_ORTHOP_SLOPE: f64 = 0.4;
pub const TP_TURB_SLOPE: f64 = 0.5;
pub const SSC_INTERCEPT: f64 = 0.3;
pub const SSC_TURB_SLOPE: f64 = 1.1;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub start: NaiveDateTime,
    pub days: i64,
    pub n_samples: usize,
    pub seed: u64,
    /// Lab noise standard deviation in log10 units.
    pub noise_sd: f64,
    /// Day offsets `[from, to)` during which the OrthoP sensor is offline.
    pub orthop_outage: Option<(i64, i64)>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2015, 10, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            days: 120,
            n_samples: 40,
            seed: 42,
            noise_sd: 0.05,
            orthop_outage: Some((40, 60)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSite {
    /// `Discharge`, `Turb_YSI`, `OrthoP`, `NitrateSurr` at 15-minute cadence.
    pub surrogates: Table,
    /// `TP`, `SSC` lab samples at irregular times.
    pub constituents: Table,
}

pub fn generate_site(config: &SyntheticConfig) -> Result<SyntheticSite, QwError> {
    if config.days <= 0 {
        return Err(QwError::Config("synthetic record must span at least one day".to_string()));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(QwError::Config("invalid synthetic noise level".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| QwError::Config(format!("noise distribution error: {e}")))?;

    let steps_per_day = 24 * 60 / SAMPLE_INTERVAL_MINUTES;
    let n = (config.days * steps_per_day) as usize;
    let step = Duration::minutes(SAMPLE_INTERVAL_MINUTES);

    let mut timestamps = Vec::with_capacity(n);
    let mut discharge = Vec::with_capacity(n);
    let mut turbidity = Vec::with_capacity(n);
    let mut orthop = Vec::with_capacity(n);
    let mut nitrate = Vec::with_capacity(n);

    for k in 0..n {
        let t = config.start + step * k as i32;
        let day = k as f64 / steps_per_day as f64;

        // Storm-like seasonal hydrograph with sensor noise.
        let wave = (std::f64::consts::TAU * day / 30.0).sin();
        let q = 300.0 * (0.8 * wave + 0.05 * normal.sample(&mut rng)).exp();
        let q_rel = q / 300.0;
        let turb = 20.0 * q_rel.powf(1.2) * (0.1 * normal.sample(&mut rng)).exp();
        let op = 0.05 * q_rel.powf(0.3) * (0.05 * normal.sample(&mut rng)).exp();
        let no3 = 4.0 + 1.5 * wave + 0.1 * normal.sample(&mut rng);

        let offline = config
            .orthop_outage
            .is_some_and(|(from, to)| (from as f64) <= day && day < to as f64);

        timestamps.push(t);
        discharge.push(Some(q));
        turbidity.push(Some(turb));
        orthop.push(if offline { None } else { Some(op) });
        nitrate.push(Some(no3.max(0.1)));
    }

    let mut surrogates = Table::new(timestamps)?;
    surrogates.set_column("Discharge", discharge)?;
    surrogates.set_column("Turb_YSI", turbidity)?;
    surrogates.set_column("OrthoP", orthop)?;
    surrogates.set_column("NitrateSurr", nitrate)?;

    let constituents = lab_samples(&surrogates, config, &mut rng, &normal)?;

    Ok(SyntheticSite {
        surrogates,
        constituents,
    })
}

/// Draw lab samples a few minutes off the sensor grid.
fn lab_samples(
    surrogates: &Table,
    config: &SyntheticConfig,
    rng: &mut StdRng,
    normal: &Normal<f64>,
) -> Result<Table, QwError> {
    let n = surrogates.len();
    let mut slots: Vec<usize> = (0..config.n_samples.min(n)).map(|_| rng.gen_range(0..n)).collect();
    slots.sort_unstable();
    slots.dedup();

    let turb = surrogates.values("Turb_YSI").unwrap_or_default();
    let orthop = surrogates.values("OrthoP").unwrap_or_default();

    let mut timestamps = Vec::with_capacity(slots.len());
    let mut tp = Vec::with_capacity(slots.len());
    let mut ssc = Vec::with_capacity(slots.len());

    for slot in slots {
        let offset = Duration::minutes(rng.gen_range(0..SAMPLE_INTERVAL_MINUTES));
        timestamps.push(surrogates.timestamps()[slot] + offset);

        let log_turb = turb.get(slot).copied().flatten().map(f64::log10);
        // TP depends on OrthoP, which has no true value while the sensor is offline;
        // fall back to the turbidity-only relationship there.
        let log_op = orthop
            .get(slot)
            .copied()
            .flatten()
            .map(f64::log10)
            .unwrap_or(0.05f64.log10());

        tp.push(log_turb.map(|lt| {
            let z = normal.sample(rng);
            10f64.powf(TP_INTERCEPT + TP_ORTHOP_SLOPE * log_op + TP_TURB_SLOPE * lt + config.noise_sd * z)
        }));
        ssc.push(log_turb.map(|lt| {
            let z = normal.sample(rng);
            10f64.powf(SSC_INTERCEPT + SSC_TURB_SLOPE * lt + config.noise_sd * z)
        }));
    }

    let mut table = Table::new(timestamps)?;
    table.set_column("TP", tp)?;
    table.set_column("SSC", ssc)?;
    Ok(table)
}
