//! ErrorReport - the payload carried by the error uploader

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured error, ready to be uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Short summary (usually the error type or first line)
    pub title: String,

    /// Human-readable message
    pub message: String,

    /// Backtrace or extra context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// When the error was captured
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Component that raised the error
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

impl ErrorReport {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
            source: String::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Build a report from a plain text line.
    ///
    /// `"Title: message"` splits on the first colon; anything else becomes
    /// both title and message.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        match text.split_once(':') {
            Some((title, message)) if !title.trim().is_empty() => {
                Self::new(title.trim(), message.trim())
            }
            _ => Self::new(text, text),
        }
    }
}
