//! Input/output helpers.
//!
//! - parameter-code vocabulary (`codes`)
//! - CSV ingest + row validation (`ingest`)
//! - site data stores and proxy fill (`store`)
//! - CSV/JSON exports (`export`)

pub mod codes;
pub mod export;
pub mod ingest;
pub mod store;

pub use codes::*;
pub use export::*;
pub use ingest::*;
pub use store::*;
