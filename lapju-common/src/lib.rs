//! # LAPJU Common Library
//!
//! Shared code for the LAPJU progress-tracking tools including:
//! - Database schema, models and queries
//! - Nested-set tree helpers
//! - Weight normalization
//! - Progress rollup computation
//! - S-curve backfill scheduling
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod fixed;
pub mod normalize;
pub mod rollup;
pub mod scurve;
pub mod tree;

pub use error::{Error, Result};
pub use rollup::RollupMode;
