//! Data sources that do not come from a store.
//!
//! - `synthetic`: seeded synthetic monitoring site for the demo and tests

pub mod synthetic;

pub use synthetic::*;
