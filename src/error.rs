//! Error types shared across the crate.

use thiserror::Error;

/// Errors that can occur in any part of the generation or streaming pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic errors.
    #[error("{0}")]
    Generic(String),

    /// Errors related to command-line options.
    #[error("CLI error: {0}")]
    Cli(String),

    /// Errors related to file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to the stream mode server.
    #[error("Server error: {0}")]
    Server(String),

    /// Errors related to the stream mode clients.
    #[error("Client error: {0}")]
    Client(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Generic(format!("Failed to parse YAML: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(format!("JSON serialization error: {e}"))
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
