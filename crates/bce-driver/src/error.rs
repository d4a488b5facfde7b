//! Error types for BC_EMU feeder operations

use thiserror::Error;

/// Result type alias for feeder operations
pub type Result<T> = std::result::Result<T, FeederError>;

/// Errors that can occur while configuring or feeding the BC_EMU
#[derive(Debug, Error)]
pub enum FeederError {
    /// Missing or invalid configuration value, or unusable config file
    #[error("Config error: {reason}")]
    Config {
        /// Reason for failure
        reason: String,
    },

    /// Unrecognized or malformed command-line usage
    #[error("{reason}")]
    Cli {
        /// Reason for failure
        reason: String,
    },

    /// I/O error while reading frame data or device files
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// No PCI device matching the configured vendor:device pair
    #[error("PCI device not found: {device}")]
    DeviceNotFound {
        /// The vendor:device identifier that was searched for
        device: String,
    },

    /// Hardware-level error (identity mismatch, unusable BAR)
    #[error("Hardware error: {reason}")]
    Hardware {
        /// Reason for failure
        reason: String,
    },

    /// A register poll did not observe the expected value in time
    #[error("Timeout after {duration_ms}ms waiting for {what}")]
    Timeout {
        /// What the poll was waiting for
        what: String,
        /// Deadline that elapsed, in milliseconds
        duration_ms: u64,
    },
}

impl FeederError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a CLI usage error
    pub fn cli(reason: impl Into<String>) -> Self {
        Self::Cli {
            reason: reason.into(),
        }
    }

    /// Create a hardware error
    pub fn hardware(reason: impl Into<String>) -> Self {
        Self::Hardware {
            reason: reason.into(),
        }
    }

    /// Create a poll-timeout error
    pub fn timeout(what: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            duration_ms,
        }
    }
}
