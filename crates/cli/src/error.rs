//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A sink could not be set up
    #[error("Failed to set up sink '{sink}': {source}")]
    SinkSetup {
        sink: String,
        #[source]
        source: dispatcher::DispatcherError,
    },

    /// Reading input failed
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn sink_setup(sink: impl Into<String>, source: dispatcher::DispatcherError) -> Self {
        Self::SinkSetup {
            sink: sink.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
