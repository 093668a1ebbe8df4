//! Candidate fitting and hierarchical selection.
//!
//! Responsibilities:
//!
//! - fit one candidate per model spec (parallel)
//! - rank candidates by adjusted r² and screen them against thresholds
//! - merge qualifying predictions so the best model wins where it has data

pub mod builder;
pub mod hierarchy;

pub use builder::*;
pub use hierarchy::*;
