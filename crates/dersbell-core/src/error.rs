//! Unified error types for DersBell.

use thiserror::Error;

/// Result type alias using DersBellError.
pub type Result<T> = std::result::Result<T, DersBellError>;

#[derive(Error, Debug)]
pub enum DersBellError {
    // Channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    // Timetable errors
    #[error("Schedule error: {0}")]
    Schedule(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl DersBellError {
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
