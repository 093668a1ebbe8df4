//! Reporting: candidate summaries and load tables.
//!
//! Formatting lives here so the fitting and load code stays free of
//! presentation concerns.

pub mod load_table;
pub mod summary;

pub use load_table::*;
pub use summary::*;
