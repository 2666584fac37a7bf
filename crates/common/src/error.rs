//! Error types for fixturekit

use thiserror::Error;

/// Result type alias using the fixture error
pub type FixtureResult<T> = std::result::Result<T, FixtureError>;

/// Fixture error taxonomy
#[derive(Error, Debug)]
pub enum FixtureError {
    /// A required provider, policy or registration is missing before use
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote automation endpoint is unreachable or returned an error
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bootstrap failed for {path}: {reason}")]
    Bootstrap { path: String, reason: String },

    #[error("Application error: {0}")]
    Application(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

impl FixtureError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error came from the remote endpoint
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FixtureError::Bootstrap {
            path: "boot/env.sh".into(),
            reason: "exit status 3".into(),
        };
        assert_eq!(err.to_string(), "Bootstrap failed for boot/env.sh: exit status 3");
        assert!(FixtureError::transport("refused").is_transport());
        assert!(!FixtureError::invalid_state("live").is_transport());
    }
}
