//! Error types for speech stream reframing.
//!
//! Only conditions that end a stream instance are errors. Two things that look
//! like failures are deliberately not represented here:
//!
//! - **Invalid frame indicators** are resolved inside the reframer by single-byte
//!   resynchronization and only show up in diagnostic logs.
//! - **Backpressure** is a flow-control status ([`crate::ProcessStatus::WouldBlock`]),
//!   not an error.
//!
//! ## Error Categories
//!
//! - **Format Errors**: the stream header matches no supported marker
//! - **Source Errors**: the byte source failed to open, read or reposition
//! - **Configuration Errors**: invalid or unparsable configuration
//! - **State Errors**: an operation was invoked in a state that cannot serve it
//!
//! ```rust
//! use speechframe::ReframeError;
//!
//! let error = ReframeError::unrecognized_format("no marker in 20 byte prefix");
//! assert!(error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reframing operations.
pub type Result<T, E = ReframeError> = std::result::Result<T, E>;

/// Main error type for reframing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReframeError {
    #[error("Unrecognized stream format: {reason}")]
    UnrecognizedFormat { reason: String },

    #[error("Unsupported stream format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Byte source error: {path}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration for {field}: {details}")]
    Config { field: String, details: String },

    #[error("Operation '{operation}' is not valid in state {state}")]
    InvalidState { operation: String, state: String },

    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: String },

    #[error("Reframe driver failed: {reason}")]
    DriverFailed { reason: String },
}

impl ReframeError {
    /// Returns whether the stream instance that produced this error is unusable.
    ///
    /// Configuration errors are raised before any stream exists, and a closed
    /// channel only means the consumer went away.
    pub fn is_fatal(&self) -> bool {
        match self {
            ReframeError::UnrecognizedFormat { .. } => true,
            ReframeError::UnsupportedFormat { .. } => true,
            ReframeError::Source { .. } => true,
            ReframeError::Io { .. } => true,
            ReframeError::InvalidState { .. } => true,
            ReframeError::DriverFailed { .. } => true,
            ReframeError::Config { .. } => false,
            ReframeError::ChannelClosed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ReframeError::UnrecognizedFormat { .. } => vec![
                "Check the stream starts with an #!AMR, #!AMR-WB, #!EVRC or #!SMV header",
                "Verify the source delivers at least the first 20 bytes of the stream",
            ],
            ReframeError::UnsupportedFormat { .. } => vec![
                "Convert multichannel storage to single-channel files",
                "Check the codec is one of AMR, AMR-WB, EVRC or SMV",
            ],
            ReframeError::Source { .. } => vec![
                "Check the file or pipe exists and is readable",
                "For pipes, verify a writer is attached or enable non-blocking mode",
                "Check file permissions",
            ],
            ReframeError::Io { .. } => vec![
                "Verify the underlying device is still available",
                "Reopen the stream",
            ],
            ReframeError::Config { .. } => vec![
                "Check the configuration value ranges",
                "Remove the field to fall back to its default",
            ],
            ReframeError::InvalidState { .. } => vec![
                "Send a Play event before processing frames",
                "Create a new reframer for a replaced stream",
            ],
            ReframeError::ChannelClosed { .. } => vec![
                "Keep the connection alive while consuming frames",
                "Check whether the driver task ended after a fatal error",
            ],
            ReframeError::DriverFailed { .. } => vec![
                "Check the stream header and source with RUST_LOG=speechframe=debug",
                "Open the stream again once the source is fixed",
            ],
        }
    }

    /// Helper constructor for an unrecognized stream header.
    pub fn unrecognized_format(reason: impl Into<String>) -> Self {
        ReframeError::UnrecognizedFormat { reason: reason.into() }
    }

    /// Helper constructor for a recognized but unsupported stream header.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        ReframeError::UnsupportedFormat { format: format.into() }
    }

    /// Helper constructor for source errors with path context.
    pub fn source_error(path: PathBuf, source: std::io::Error) -> Self {
        ReframeError::Source { path, source }
    }

    /// Helper constructor for I/O errors outside of any known path.
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        ReframeError::Io { operation: operation.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(field: impl Into<String>, details: impl Into<String>) -> Self {
        ReframeError::Config { field: field.into(), details: details.into() }
    }

    /// Helper constructor for state errors.
    pub fn invalid_state(operation: impl Into<String>, state: impl std::fmt::Debug) -> Self {
        ReframeError::InvalidState { operation: operation.into(), state: format!("{:?}", state) }
    }

    /// Helper constructor for closed channels.
    pub fn channel_closed(channel: impl Into<String>) -> Self {
        ReframeError::ChannelClosed { channel: channel.into() }
    }

    /// Helper constructor for a driver task that ended with an error.
    pub fn driver_failed(reason: impl Into<String>) -> Self {
        ReframeError::DriverFailed { reason: reason.into() }
    }
}

impl From<std::io::Error> for ReframeError {
    fn from(err: std::io::Error) -> Self {
        ReframeError::Io { operation: "unknown operation".to_string(), source: err }
    }
}

impl From<serde_yaml_ng::Error> for ReframeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        ReframeError::Config { field: "<document>".to_string(), details: err.to_string() }
    }
}
