//! `qw-loads` library crate.
//!
//! The binary (`qw`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the store, fitting and load layers can be driven from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod loads;
pub mod math;
pub mod models;
pub mod report;
