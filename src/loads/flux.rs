//! Instantaneous flux.
//!
//! Discharge is in cubic feet per second and concentration in mg/L; each
//! 15-minute reading is converted to the mass carried during its interval.

use crate::domain::{LoadUnits, TimeSeries};

/// Pounds per milligram.
pub const MG_TO_LB: f64 = 2.20462e-6;
/// Liters per cubic foot.
pub const LITERS_PER_CUBIC_FOOT: f64 = 1.0 / 0.0353137;
pub const SECONDS_PER_MINUTE: f64 = 60.0;
/// Length of one sensor reading interval.
pub const SAMPLE_INTERVAL_SECONDS: f64 = 15.0 * SECONDS_PER_MINUTE;
/// Tons per pound.
pub const LB_TO_TON: f64 = 0.0005;
/// Expected readings per year at the 15-minute cadence (4 per hour).
pub const SAMPLES_PER_YEAR: f64 = 4.0 * 24.0 * 365.25;

/// cfs × mg/L → lbs per reading interval.
pub const FLUX_CONVERSION: f64 = MG_TO_LB * LITERS_PER_CUBIC_FOOT * SAMPLE_INTERVAL_SECONDS;

/// Multiplier from cfs × mg/L to mass per interval in `units`.
pub fn conversion_factor(units: LoadUnits) -> f64 {
    match units {
        LoadUnits::Pounds => FLUX_CONVERSION,
        LoadUnits::Tons => FLUX_CONVERSION * LB_TO_TON,
    }
}

/// Mass per 15-minute interval on the union of both indexes.
///
/// A row is missing wherever discharge or concentration is missing.
pub fn instantaneous_flux(
    discharge: &TimeSeries,
    concentration: &TimeSeries,
    units: LoadUnits,
) -> TimeSeries {
    let k = conversion_factor(units);
    discharge.zip_with(concentration, "Flux", |q, c| q * c * k)
}
