//! # POI Common Library
//!
//! Shared code for the points-of-interest importer:
//! - Error and result types
//! - Configuration loading (CLI → ENV → TOML → OS default)
//! - Database initialization, stored record model and queries

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
