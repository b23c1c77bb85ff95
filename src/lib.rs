//! geoscout — conversational discovery service for community
//! geospatial datasets.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod gateway;
pub mod models;
pub mod tools;

/// Return the geoscout home directory.
///
/// Resolution order:
/// 1. `GEOSCOUT_HOME` environment variable
/// 2. `$HOME/.geoscout`
pub fn geoscout_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("GEOSCOUT_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".geoscout")
    }
}
