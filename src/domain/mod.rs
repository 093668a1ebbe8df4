//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - time-indexed data (`TimeSeries`, `Table`)
//! - variable/model specifications (`Transform`, `Variable`, `ModelSpec`)
//! - selection thresholds and load units
//! - project configuration (`ProjectConfig`)

pub mod config;
pub mod series;
pub mod types;

pub use config::*;
pub use series::*;
pub use types::*;
