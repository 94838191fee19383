//! Error types for log parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading the DHIS2 log file set
#[derive(Debug, Error)]
pub enum LogError {
    /// The live log file does not exist in the logs folder
    #[error("Log file not found: {}", .path.display())]
    MissingLogFile { path: PathBuf },

    /// I/O error when listing the logs folder or reading a log file
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for log parsing operations
pub type Result<T> = std::result::Result<T, LogError>;
