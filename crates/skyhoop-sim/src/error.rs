//! Error types for the simulation crate.
//!
//! The simulation tick itself never fails: out-of-range inputs are normalised
//! and missing geometry degrades to fallbacks. Errors only surface while
//! loading configuration.

use std::fmt;

/// Result type for simulation setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or validating simulation inputs.
#[derive(Debug)]
pub enum Error {
    /// Reading a configuration file failed.
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// JSON decoding failed.
    Json {
        /// What was being decoded.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// A parameter value is outside its permitted range.
    InvalidParam {
        /// The parameter name.
        name: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// A track definition cannot produce a course.
    InvalidTrack {
        /// Description of what was invalid.
        detail: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            Error::Json { context, message } => {
                write!(f, "failed to decode {context}: {message}")
            }
            Error::InvalidParam { name, detail } => {
                write!(f, "invalid parameter {name}: {detail}")
            }
            Error::InvalidTrack { detail } => write!(f, "invalid track: {detail}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Read a UTF-8 file, attaching the path to any failure.
pub(crate) fn read_to_string(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Decode JSON into `T`, tagging failures with `context`.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    context: &'static str,
    json: &str,
) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::Json {
        context,
        message: e.to_string(),
    })
}
