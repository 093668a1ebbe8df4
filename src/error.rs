//! Error types.
//!
//! Three layers, from the inside out:
//!
//! - [`FitFailure`]: why one candidate regression could not be fit. Always caught
//!   by the candidate-set builder and recorded on the candidate.
//! - [`QwError`]: typed library errors (configuration, data, merge failures).
//! - [`AppError`]: what the `qw` binary prints, with a process exit code.

use thiserror::Error;

/// Reason a single candidate regression failed to fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("insufficient matched samples: {matched} < {required}")]
    InsufficientSamples { matched: usize, required: usize },
    #[error("singular design matrix")]
    SingularFit,
    #[error("non-positive values in log-transformed variable '{variable}'")]
    NonPositiveUnderLogTransform { variable: String },
    #[error("{0}")]
    Other(String),
}

/// Library error.
#[derive(Debug, Error)]
pub enum QwError {
    #[error("unknown transform '{function}' in expression '{expr}'")]
    UnknownTransform { function: String, expr: String },
    #[error("malformed variable expression '{0}'")]
    MalformedExpression(String),
    #[error("only one raw constituent allowed per model list, found: {}", .found.join(", "))]
    AmbiguousConstituent { found: Vec<String> },
    #[error("model list is empty")]
    EmptyModelList,
    #[error("model for '{constituent}' has no surrogate variables")]
    EmptySurrogates { constituent: String },
    #[error("invalid load units '{0}' (expected 'lbs' or 'tons')")]
    InvalidUnits(String),
    #[error("model '{formula}' was not fit and cannot predict")]
    NotFitted { formula: String },
    #[error("no candidate model for '{constituent}' met the selection thresholds")]
    NoQualifyingModel { constituent: String },
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("invalid series: {0}")]
    InvalidSeries(String),
    #[error("site {site}: {message}")]
    SiteData { site: String, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl QwError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            QwError::UnknownTransform { .. }
            | QwError::MalformedExpression(_)
            | QwError::AmbiguousConstituent { .. }
            | QwError::EmptyModelList
            | QwError::EmptySurrogates { .. }
            | QwError::InvalidUnits(_)
            | QwError::Config(_) => 2,
            QwError::NoQualifyingModel { .. } | QwError::NotFitted { .. } => 3,
            QwError::MissingColumn(_)
            | QwError::InvalidSeries(_)
            | QwError::SiteData { .. }
            | QwError::Io(_)
            | QwError::Csv(_)
            | QwError::Json(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<QwError> for AppError {
    fn from(err: QwError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
