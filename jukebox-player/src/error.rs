//! Error types for jukebox-player
//!
//! Errors returned by control-surface calls are reported to the caller and
//! never crash the control loop. Only `CrashLoop` is fatal to the supervisor.

use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum Error {
    /// A control command targeted a player with no live process
    #[error("Process not running: {0}")]
    ProcessNotRunning(String),

    /// Malformed input such as a non-numeric volume
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No reachable song could be found for playback
    #[error("Resource unreachable: {0}")]
    ResourceUnreachable(String),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repeated unexpected child terminations
    #[error("Crash loop: {crashes} consecutive crashes within {window_secs}s")]
    CrashLoop { crashes: usize, window_secs: u64 },

    /// Command delivery to a process that is not actually alive
    #[error("Signal delivery failed: {0}")]
    SignalDelivery(String),

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File and process I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] jukebox_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable code stored in the remote command table
    pub fn code(&self) -> &'static str {
        match self {
            Error::ProcessNotRunning(_) => "process_not_running",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::ResourceUnreachable(_) => "resource_unreachable",
            Error::Database(_) => "storage_failure",
            Error::CrashLoop { .. } => "crash_loop",
            Error::SignalDelivery(_) => "signal_delivery",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Common(_) => "common",
            Error::Internal(_) => "internal",
        }
    }

    /// Message without the variant prefix, stored next to [`Error::code`]
    pub fn detail(&self) -> String {
        match self {
            Error::ProcessNotRunning(detail)
            | Error::InvalidArgument(detail)
            | Error::ResourceUnreachable(detail)
            | Error::SignalDelivery(detail)
            | Error::Config(detail)
            | Error::Internal(detail) => detail.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuild an error from a code written by [`Error::code`]
    pub fn from_code(code: &str, detail: String) -> Self {
        match code {
            "process_not_running" => Error::ProcessNotRunning(detail),
            "invalid_argument" => Error::InvalidArgument(detail),
            "resource_unreachable" => Error::ResourceUnreachable(detail),
            "signal_delivery" => Error::SignalDelivery(detail),
            "config" => Error::Config(detail),
            _ => Error::Internal(format!("{}: {}", code, detail)),
        }
    }
}
