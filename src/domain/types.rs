//! Shared domain types.
//!
//! These types describe *what* is being modelled (variables, their transforms,
//! candidate model specifications, selection thresholds, load units). They are
//! deliberately free of fitting logic so they can be built from config files,
//! CLI flags or tests alike.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::QwError;

/// Default window for pairing a lab sample with a sensor reading.
pub const DEFAULT_MATCH_TIME_MINUTES: i64 = 30;

/// Variable transform applied before regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Identity,
    Log10,
    Ln,
}

impl Transform {
    /// Apply the transform; `None` when `x` is outside its domain or not finite.
    pub fn apply(self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        match self {
            Transform::Identity => Some(x),
            Transform::Log10 if x > 0.0 => Some(x.log10()),
            Transform::Ln if x > 0.0 => Some(x.ln()),
            Transform::Log10 | Transform::Ln => None,
        }
    }

    /// Map a transformed value back to native units (no bias correction).
    pub fn invert(self, y: f64) -> f64 {
        match self {
            Transform::Identity => y,
            Transform::Log10 => 10f64.powf(y),
            Transform::Ln => y.exp(),
        }
    }

    pub fn requires_positive(self) -> bool {
        !matches!(self, Transform::Identity)
    }

    /// Function name used when rendering an expression, `None` for identity.
    pub fn function_name(self) -> Option<&'static str> {
        match self {
            Transform::Identity => None,
            Transform::Log10 => Some("log10"),
            Transform::Ln => Some("ln"),
        }
    }

    /// Render `name` wrapped in this transform, e.g. `log10(TP)`.
    pub fn wrap(self, name: &str) -> String {
        match self.function_name() {
            Some(f) => format!("{f}({name})"),
            None => name.to_string(),
        }
    }
}

/// A raw variable name together with its transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub transform: Transform,
}

impl Variable {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.transform.wrap(&self.name))
    }
}

/// One candidate regression: a transformed constituent explained by one or
/// more transformed surrogates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub constituent: Variable,
    pub surrogates: Vec<Variable>,
}

impl ModelSpec {
    /// Parse a `(constituent_expr, [surrogate_expr, ...])` pair.
    pub fn parse<S: AsRef<str>>(constituent: &str, surrogates: &[S]) -> Result<Self, QwError> {
        let constituent = crate::models::parse_variable(constituent)?;
        if surrogates.is_empty() {
            return Err(QwError::EmptySurrogates {
                constituent: constituent.to_string(),
            });
        }
        let surrogates = surrogates
            .iter()
            .map(|s| crate::models::parse_variable(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            constituent,
            surrogates,
        })
    }

    /// Same spec with repeated surrogate terms collapsed, first occurrence kept.
    pub fn deduplicated(&self) -> ModelSpec {
        let mut surrogates: Vec<Variable> = Vec::with_capacity(self.surrogates.len());
        for s in &self.surrogates {
            if !surrogates.contains(s) {
                surrogates.push(s.clone());
            }
        }
        ModelSpec {
            constituent: self.constituent.clone(),
            surrogates,
        }
    }

    /// Regression formula, e.g. `log10(TP) ~ log10(OrthoP) + log10(Turb_YSI)`.
    pub fn formula(&self) -> String {
        let rhs = self
            .surrogates
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        format!("{} ~ {rhs}", self.constituent)
    }
}

/// Quality gates a candidate must pass to contribute to a composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_samples: usize,
    pub max_p_value: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_samples: 10,
            max_p_value: 0.05,
        }
    }
}

/// Tolerance for pairing discrete samples with continuous readings.
pub fn match_tolerance(minutes: i64) -> Duration {
    Duration::minutes(minutes)
}

/// Mass unit of a load result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoadUnits {
    Pounds,
    Tons,
}

impl FromStr for LoadUnits {
    type Err = QwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lbs" => Ok(LoadUnits::Pounds),
            "tons" => Ok(LoadUnits::Tons),
            other => Err(QwError::InvalidUnits(other.to_string())),
        }
    }
}

impl TryFrom<String> for LoadUnits {
    type Error = QwError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LoadUnits> for String {
    fn from(value: LoadUnits) -> Self {
        value.to_string()
    }
}

impl fmt::Display for LoadUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadUnits::Pounds => f.write_str("lbs"),
            LoadUnits::Tons => f.write_str("tons"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_reject_values_outside_domain() {
        assert_eq!(Transform::Log10.apply(0.0), None);
        assert_eq!(Transform::Ln.apply(-1.0), None);
        assert_eq!(Transform::Identity.apply(-1.0), Some(-1.0));
        assert_eq!(Transform::Log10.apply(100.0), Some(2.0));
        assert_eq!(Transform::Identity.apply(f64::NAN), None);
        assert_eq!(Transform::Ln.apply(f64::INFINITY), None);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let spec = ModelSpec::parse("log(TP)", &["log(Turb_YSI)", "OrthoP", "log(Turb_YSI)"]).unwrap();
        let dedup = spec.deduplicated();
        assert_eq!(dedup.surrogates.len(), 2);
        assert_eq!(dedup.formula(), "log10(TP) ~ log10(Turb_YSI) + OrthoP");
    }

    #[test]
    fn empty_surrogate_list_is_a_config_error() {
        let err = ModelSpec::parse::<&str>("SSC", &[]).unwrap_err();
        assert!(matches!(err, QwError::EmptySurrogates { .. }));
    }

    #[test]
    fn units_parse_strictly() {
        assert_eq!("lbs".parse::<LoadUnits>().unwrap(), LoadUnits::Pounds);
        assert_eq!("tons".parse::<LoadUnits>().unwrap(), LoadUnits::Tons);
        assert!(matches!("kg".parse::<LoadUnits>(), Err(QwError::InvalidUnits(_))));
    }
}
