//! fixturekit common library
//!
//! Shared error taxonomy, configuration, case declarations and table storage
//! for the fixturekit crates.

pub mod config;
pub mod db;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{ApplicationConfig, DatabaseConfig, FixturesConfig, WebDriverConfig};
pub use db::{SqliteTableStore, TableStore};
pub use error::{FixtureError, FixtureResult};
pub use types::{CaseType, SharingPolicy};

/// fixturekit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, resolved relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "fixturekit.toml";
