//! Surrogate regression models.
//!
//! - `transform`: variable-expression parser (`log(TP)` -> log10 of `TP`)
//! - `regression`: the regression capability and its OLS backend
//! - `matching`: lab-sample to sensor-reading pairing
//! - `candidate`: one fitted (or failed) candidate model
//! - `prediction`: predicted series with interval bounds

pub mod candidate;
pub mod matching;
pub mod prediction;
pub mod regression;
pub mod transform;

pub use candidate::*;
pub use matching::*;
pub use prediction::*;
pub use regression::*;
pub use transform::*;
