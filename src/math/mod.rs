//! Mathematical utilities: least squares and distribution helpers.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
