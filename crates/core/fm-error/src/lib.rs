//! Error types and classification for fieldmap.
//!
//! This crate provides:
//! - [`FmError`] - Top-level error enum for all lookup-stage errors
//! - Component errors ([`FetchError`], [`DecodeError`], [`LookupError`])
//! - [`ErrorCategory`] for deciding how far a failure propagates
//! - Classification logic based on error type and [`LoadPhase`]

use thiserror::Error;

/// Top-level error type for fieldmap.
#[derive(Error, Debug)]
pub enum FmError {
    /// Fetching raw map data failed (file or web source)
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Decoding map data failed (YAML, JSON, CSV)
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Per-event lookup failed
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised while retrieving raw map bytes.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Map file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// I/O error reading a file or writing the disk cache
    #[error("I/O error: {0}")]
    Io(String),

    /// Transport failure or non-success HTTP status
    #[error("Network error: {0}")]
    Network(String),
}

/// Errors raised while parsing raw map bytes into a table.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Content does not have the shape of a flat key/value map
    #[error("Malformed map data: {0}")]
    Malformed(String),

    /// Content is not valid UTF-8
    #[error("Invalid encoding: {0}")]
    Encoding(String),
}

/// Errors raised while applying a lookup to a single event.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Field holds a value that cannot be used as a map key
    #[error("Field '{field}' holds an unsupported {kind} value")]
    UnsupportedValue { field: String, kind: &'static str },

    /// A nested field reference cannot be resolved or created
    #[error("Invalid field path '{0}'")]
    InvalidPath(String),
}

/// How an error should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The instance must not come up.
    ///
    /// Examples: unreachable source at startup, malformed map at startup, bad config
    Fatal,

    /// Keep the previous table and continue serving lookups.
    ///
    /// Examples: network outage or malformed map during a scheduled refresh
    Recoverable,

    /// Absorb and log; the event passes through unmodified.
    ///
    /// Examples: object-valued lookup field
    PerEvent,
}

/// Phase of the map lifecycle in which a load error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Synchronous load during registration
    Initial,

    /// Scheduled reload on the event path
    Refresh,
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Classifies an error to decide whether it is fatal.
///
/// # Arguments
///
/// * `error` - The error to classify
/// * `phase` - The load phase the error surfaced in
///
/// # Returns
///
/// The appropriate [`ErrorCategory`]
pub fn classify_error(error: &FmError, phase: LoadPhase) -> ErrorCategory {
    match error {
        FmError::Fetch(_) | FmError::Decode(_) | FmError::Other(_) => classify_load_error(phase),
        FmError::Lookup(_) => ErrorCategory::PerEvent,
        FmError::Config(_) => ErrorCategory::Fatal,
    }
}

fn classify_load_error(phase: LoadPhase) -> ErrorCategory {
    match phase {
        LoadPhase::Initial => ErrorCategory::Fatal,
        LoadPhase::Refresh => ErrorCategory::Recoverable,
    }
}

/// Result type alias using FmError.
pub type Result<T> = std::result::Result<T, FmError>;
