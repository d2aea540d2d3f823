//! Custom error types for kbctl

use thiserror::Error;

/// Main error type for kbctl operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP exchange itself failed (no structured error body).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A structurally successful exchange whose envelope declared failure.
    /// The message is the server-supplied error text, verbatim.
    #[error("{0}")]
    Api(String),

    /// Client-local input validation; never sent to the server.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not initialized: run 'kbctl init' first")]
    NotInitialized,

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Result type alias for kbctl
pub type Result<T> = std::result::Result<T, Error>;
