//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Every failure surfaces at the single edit-call boundary with an
//! HTTP-style status code; there are no retries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("{message}")]
    UpstreamHttp { status: u16, message: String },

    #[error("Upstream request timed out")]
    UpstreamTimeout,

    #[error("Upstream connection error: {0}")]
    UpstreamConnection(String),

    #[error("Failed to parse upstream response: {0}")]
    ResponseParse(String),

    #[error("Failed to decode generated image: {0}")]
    ImageDecode(String),

    #[error("Failed to extract image or text from response")]
    NoContent,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP-style status code reported to the caller for this failure.
    ///
    /// Upstream HTTP errors relay the exact upstream status; everything
    /// else maps to 400 (bad input) or 500.
    pub fn status(&self) -> u16 {
        match self {
            Error::Input(_) => 400,
            Error::UpstreamHttp { status, .. } => *status,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
