//! Error types for the client adapters.

use std::fmt;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the adapters around the simulation core.
#[derive(Debug)]
pub enum Error {
    /// Loading simulation inputs failed.
    Sim(skyhoop_sim::Error),
    /// A control message could not be decoded.
    Protocol {
        /// The error message.
        message: String,
    },
    /// A flight script line could not be decoded.
    Script {
        /// One-based line number.
        line: usize,
        /// The error message.
        message: String,
    },
    /// A mesh could not be turned into collision geometry.
    MeshImport {
        /// Name of the mesh.
        name: String,
        /// Description of what was wrong.
        detail: String,
    },
    /// Reading or writing a file failed.
    Io {
        /// The path involved.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sim(e) => write!(f, "{e}"),
            Error::Protocol { message } => write!(f, "invalid control message: {message}"),
            Error::Script { line, message } => write!(f, "script line {line}: {message}"),
            Error::MeshImport { name, detail } => {
                write!(f, "cannot import mesh {name}: {detail}")
            }
            Error::Io { path, source } => write!(f, "I/O error on {path}: {source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Sim(e) => Some(e),
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<skyhoop_sim::Error> for Error {
    fn from(e: skyhoop_sim::Error) -> Self {
        Error::Sim(e)
    }
}
