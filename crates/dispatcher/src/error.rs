//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// No execution context could run the delayed flush.
    /// The submitted item stays pending.
    #[error("failed to schedule flush: {message}")]
    Scheduling { message: String },

    /// Submit after shutdown
    #[error("dispatcher '{name}' is shut down")]
    Closed { name: String },

    /// Sink error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a scheduling error
    pub fn scheduling(message: impl Into<String>) -> Self {
        Self::Scheduling {
            message: message.into(),
        }
    }
}
