//! Project configuration.
//!
//! A project names the monitoring sites to process and, for each constituent,
//! either a list of candidate surrogate models or a probe column that measures
//! the constituent directly. Projects are read from TOML; when no file is given
//! the built-in nutrient-network project is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{LoadUnits, ModelSpec, Thresholds, DEFAULT_MATCH_TIME_MINUTES};
use crate::error::QwError;

pub const STORE_ENV: &str = "QW_STORE";
pub const CONFIG_ENV: &str = "QW_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: String,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_match_time")]
    pub match_time_minutes: i64,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    pub constituents: Vec<ConstituentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Column name -> site id whose data fills gaps in that column.
    #[serde(default)]
    pub proxies: BTreeMap<String, String>,
}

impl SiteConfig {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituentConfig {
    /// Raw constituent name, also the prediction column name.
    pub name: String,
    /// Load-table column label, e.g. `Phosphorus (lbs)`.
    pub label: String,
    pub units: LoadUnits,
    #[serde(default)]
    pub models: Vec<(String, Vec<String>)>,
    /// Surrogate column that measures the constituent directly.
    #[serde(default)]
    pub probe: Option<String>,
}

/// How a constituent's concentration series is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ConcentrationSource {
    Hierarchical(Vec<ModelSpec>),
    Probe(String),
}

impl ConstituentConfig {
    pub fn source(&self) -> Result<ConcentrationSource, QwError> {
        match (&self.probe, self.models.is_empty()) {
            (Some(probe), true) => Ok(ConcentrationSource::Probe(probe.clone())),
            (None, false) => {
                let specs = self
                    .models
                    .iter()
                    .map(|(c, s)| ModelSpec::parse(c, s))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ConcentrationSource::Hierarchical(specs))
            }
            (Some(_), false) => Err(QwError::Config(format!(
                "constituent '{}' declares both a probe and models",
                self.name
            ))),
            (None, true) => Err(QwError::Config(format!(
                "constituent '{}' declares neither a probe nor models",
                self.name
            ))),
        }
    }
}

fn default_match_time() -> i64 {
    DEFAULT_MATCH_TIME_MINUTES
}

impl ProjectConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, QwError> {
        let config: ProjectConfig =
            toml::from_str(text).map_err(|e| QwError::Config(format!("invalid project TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, QwError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            QwError::Config(format!("failed to read project file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the project: explicit path, then `QW_CONFIG`, then the built-in default.
    pub fn resolve(path: Option<&Path>) -> Result<Self, QwError> {
        match path.map(Path::to_path_buf).or_else(|| env_path(CONFIG_ENV)) {
            Some(path) => Self::load(&path),
            None => Ok(Self::nutrient_network()),
        }
    }

    pub fn validate(&self) -> Result<(), QwError> {
        if self.match_time_minutes <= 0 {
            return Err(QwError::Config("match_time_minutes must be > 0".to_string()));
        }
        if !(self.thresholds.max_p_value.is_finite() && self.thresholds.max_p_value > 0.0) {
            return Err(QwError::Config("max_p_value must be a positive number".to_string()));
        }
        for c in &self.constituents {
            c.source()?;
        }
        Ok(())
    }

    pub fn constituent(&self, name: &str) -> Result<&ConstituentConfig, QwError> {
        self.constituents
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| QwError::Config(format!("unknown constituent '{name}'")))
    }

    pub fn site(&self, id: &str) -> SiteConfig {
        self.sites
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap_or_else(|| SiteConfig {
                id: id.to_string(),
                name: None,
                proxies: BTreeMap::new(),
            })
    }

    /// Illinois nutrient monitoring network defaults.
    pub fn nutrient_network() -> Self {
        let site = |id: &str, name: &str| SiteConfig {
            id: id.to_string(),
            name: Some(name.to_string()),
            proxies: BTreeMap::new(),
        };
        let with_q_proxy = |mut s: SiteConfig, proxy: &str| {
            s.proxies.insert("Discharge".to_string(), proxy.to_string());
            s
        };
        let model = |c: &str, s: &[&str]| (c.to_string(), s.iter().map(|v| v.to_string()).collect());

        ProjectConfig {
            project: "Illinois Nutrient Monitoring Network".to_string(),
            thresholds: Thresholds::default(),
            match_time_minutes: DEFAULT_MATCH_TIME_MINUTES,
            sites: vec![
                site("03339000", "Vermillion"),
                site("03346500", "Embarras"),
                with_q_proxy(site("03381495", "LittleWabash"), "03381500"),
                site("05446500", "Rock"),
                site("05447500", "Green"),
                with_q_proxy(site("05586300", "Illinois"), "05586100"),
                site("05595000", "Kaskaskia"),
                site("05599490", "BigMuddy"),
            ],
            constituents: vec![
                ConstituentConfig {
                    name: "Nitrate".to_string(),
                    label: "Nitrate (lbs-N)".to_string(),
                    units: LoadUnits::Pounds,
                    models: Vec::new(),
                    probe: Some("NitrateSurr".to_string()),
                },
                ConstituentConfig {
                    name: "TP".to_string(),
                    label: "Phosphorus (lbs)".to_string(),
                    units: LoadUnits::Pounds,
                    models: vec![
                        model("log(TP)", &["log(OrthoP)", "log(Turb_YSI)"]),
                        model("log(TP)", &["log(Turb_YSI)"]),
                    ],
                    probe: None,
                },
                ConstituentConfig {
                    name: "SSC".to_string(),
                    label: "SSC (tons)".to_string(),
                    units: LoadUnits::Tons,
                    models: vec![model("log(SSC)", &["log(Turb_YSI)"])],
                    probe: None,
                },
            ],
        }
    }
}

/// Store root: explicit path, then `QW_STORE` (after loading `.env`).
pub fn resolve_store_root(path: Option<&Path>) -> Result<PathBuf, QwError> {
    path.map(Path::to_path_buf)
        .or_else(|| env_path(STORE_ENV))
        .ok_or_else(|| QwError::Config(format!("no store given (pass --store or set {STORE_ENV})")))
}

fn env_path(key: &str) -> Option<PathBuf> {
    dotenvy::dotenv().ok();
    std::env::var_os(key).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_project_is_valid() {
        let config = ProjectConfig::nutrient_network();
        config.validate().unwrap();
        assert!(matches!(
            config.constituent("Nitrate").unwrap().source().unwrap(),
            ConcentrationSource::Probe(_)
        ));
        assert_eq!(config.site("03381495").proxies["Discharge"], "03381500");
    }

    #[test]
    fn parses_toml_project() {
        let text = r#"
            project = "Test"
            match_time_minutes = 20

            [thresholds]
            min_samples = 5

            [[sites]]
            id = "05586300"
            proxies = { Discharge = "05586100" }

            [[constituents]]
            name = "SSC"
            label = "SSC (tons)"
            units = "tons"
            models = [["log(SSC)", ["log(Turb_YSI)", "log(Discharge)"]]]
        "#;
        let config = ProjectConfig::from_toml_str(text).unwrap();
        assert_eq!(config.thresholds.min_samples, 5);
        assert_eq!(config.thresholds.max_p_value, 0.05);
        assert_eq!(config.match_time_minutes, 20);
        assert_eq!(config.constituents[0].units, LoadUnits::Tons);
        match config.constituents[0].source().unwrap() {
            ConcentrationSource::Hierarchical(specs) => assert_eq!(specs[0].surrogates.len(), 2),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_units_and_unknown_transforms() {
        let bad_units = r#"
            project = "x"
            [[constituents]]
            name = "TP"
            label = "TP"
            units = "kg"
            probe = "TPSurr"
        "#;
        assert!(ProjectConfig::from_toml_str(bad_units).is_err());

        let bad_transform = r#"
            project = "x"
            [[constituents]]
            name = "TP"
            label = "TP"
            units = "lbs"
            models = [["sqrt(TP)", ["Turb"]]]
        "#;
        assert!(matches!(
            ProjectConfig::from_toml_str(bad_transform),
            Err(QwError::UnknownTransform { .. })
        ));
    }
}
