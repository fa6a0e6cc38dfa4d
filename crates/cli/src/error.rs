//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Simulator connection error
    #[error("failed to connect to simulator at {host}:{port}: {message}")]
    SimulatorConnection {
        host: String,
        port: u16,
        message: String,
    },

    /// A sensor subscription could not be set up
    #[error("subscription setup failed: {message}")]
    Subscription { message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn simulator_connection(
        host: impl Into<String>,
        port: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::SimulatorConnection {
            host: host.into(),
            port,
            message: message.into(),
        }
    }

    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }
}

/// Fail with [`CliError::ConfigNotFound`] when `path` does not exist
pub fn ensure_config_exists(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CliError::config_not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_config_exists(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().starts_with("configuration file not found"));
        assert!(ensure_config_exists(dir.path()).is_ok());
    }
}
