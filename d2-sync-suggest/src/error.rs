//! Error types for suggestion operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors in message templates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` without its `}`, or a lone `}`
    #[error("Unbalanced brace at offset {offset} in template `{template}`")]
    Unbalanced { template: String, offset: usize },

    /// `{}` or a placeholder name that is not an identifier
    #[error("Invalid placeholder `{name}` in template `{template}`")]
    InvalidPlaceholder { template: String, name: String },

    /// Interpolation found no value for a placeholder
    #[error("Missing variable `{0}`")]
    MissingVariable(String),
}

/// Errors that can occur while loading mappings or querying DHIS2
#[derive(Debug, Error)]
pub enum SuggestError {
    /// I/O error when reading the mappings file
    #[error("Failed to read mappings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON mappings file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML mappings file {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Error template of a mapping cannot be compiled
    #[error("Invalid error mapping #{index}: {source}")]
    Mapping {
        index: usize,
        #[source]
        source: TemplateError,
    },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Error template produced an invalid regular expression
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid DHIS2 base URL
    #[error("Invalid DHIS2 URL `{0}`")]
    InvalidUrl(String),

    /// HTTP or decoding failure talking to DHIS2
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body does not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// A specialized Result type for suggestion operations
pub type Result<T> = std::result::Result<T, SuggestError>;
