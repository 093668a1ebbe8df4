//! Load calculation.
//!
//! - `flux`: instantaneous mass flux from discharge and concentration
//! - `water_year`: Oct 1 to Sep 30 accounting windows
//! - `annual`: mean-based and summed annual loads

pub mod annual;
pub mod flux;
pub mod water_year;

pub use annual::*;
pub use flux::*;
pub use water_year::*;
