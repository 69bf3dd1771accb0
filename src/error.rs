//! Error types for level construction, configuration and physics access.

use thiserror::Error;

use crate::sim::physics::BodyHandle;

/// Crate error type
#[derive(Error, Debug)]
pub enum Error {
    /// Generator, bounds or tuning parameters that cannot produce a level
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong
        reason: String,
    },

    /// A body handle the physics world does not know about
    #[error("Physics body {0:?} does not exist")]
    MissingBody(BodyHandle),

    /// Settings file could not be read
    #[error("Failed to read settings: {0}")]
    SettingsIo(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("Failed to parse settings: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
