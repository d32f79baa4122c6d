//! TIRS Types - shared data model for the risk-governance core.
//!
//! Constitutional separation: identifiers ≠ intents ≠ risk bands ≠ context.
//! Everything that crosses a crate boundary lives here so the subsystem
//! crates never depend on each other's internals.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod config;
mod context;
mod ids;
mod intent;
mod risk;

pub use config::*;
pub use context::*;
pub use ids::*;
pub use intent::*;
pub use risk::*;

/// Schema version for persisted records.
pub const SCHEMA_VERSION: &str = "1.0.0";
