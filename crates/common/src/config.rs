//! Fixture configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FixtureResult;

/// Top-level fixture configuration, usually read from `fixturekit.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Remote automation endpoint
    pub webdriver: WebDriverConfig,

    /// Application bootstrap
    pub application: ApplicationConfig,

    /// Table fixtures
    pub database: DatabaseConfig,
}

/// Remote WebDriver endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Base URL of the endpoint
    pub url: String,

    /// Desired capabilities sent when opening a session
    pub capabilities: serde_json::Value,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4444".to_string(),
            capabilities: serde_json::json!({ "browserName": "firefox" }),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
        }
    }
}

impl WebDriverConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Application bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Scripts executed before the first application is built, in order
    pub bootstrap_files: Vec<PathBuf>,

    /// Process environment set before every application build
    pub server_vars: BTreeMap<String, String>,

    /// Opaque construction blob handed to the application factory
    pub app_config: serde_json::Value,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            bootstrap_files: Vec::new(),
            server_vars: BTreeMap::new(),
            app_config: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Table fixture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,

    /// Directory holding `<table>.json` fixture files
    pub fixtures_dir: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tests/_data/test.db"),
            fixtures_dir: PathBuf::from("tests/_data/fixtures"),
        }
    }
}

impl FixturesConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> FixtureResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> FixtureResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FixturesConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.webdriver.url, "http://127.0.0.1:4444");
        assert_eq!(config.webdriver.connect_timeout(), Duration::from_secs(10));
        assert!(config.application.bootstrap_files.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixturekit.toml");
        std::fs::write(
            &path,
            r#"
[webdriver]
url = "http://grid.internal:4444/wd/hub"
request_timeout_ms = 5000

[webdriver.capabilities]
browserName = "chrome"

[application]
bootstrap_files = ["tests/_bootstrap.sh"]

[application.server_vars]
APP_ENV = "test"
"#,
        )
        .unwrap();

        let config = FixturesConfig::load(&path).unwrap();
        assert_eq!(config.webdriver.url, "http://grid.internal:4444/wd/hub");
        assert_eq!(config.webdriver.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.webdriver.connect_timeout_ms, 10_000);
        assert_eq!(config.webdriver.capabilities["browserName"], "chrome");
        assert_eq!(config.application.server_vars["APP_ENV"], "test");
        assert_eq!(config.database.fixtures_dir, PathBuf::from("tests/_data/fixtures"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fixturekit.toml");

        let mut config = FixturesConfig::default();
        config.webdriver.url = "http://10.0.0.5:4444".into();
        config.save(&path).unwrap();

        let loaded = FixturesConfig::load(&path).unwrap();
        assert_eq!(loaded.webdriver.url, "http://10.0.0.5:4444");
    }
}
