//! Data models and structures
//!
//! Defines the per-call edit request/outcome types and the environment
//! configuration for the Gemini-backed edit service.

use crate::prompts;

/// One inbound edit call: image bytes, declared mime type, and the edit
/// instruction. Created per call, never persisted.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub image: Vec<u8>,
    pub mime_type: String,
    pub prompt: String,
}

impl EditRequest {
    /// Build a request, filling in the caller-facing defaults: mime type
    /// falls back to `image/jpeg`, prompt to the built-in edit suggestion.
    pub fn new(image: Vec<u8>, mime_type: Option<String>, prompt: Option<String>) -> Self {
        Self {
            image,
            mime_type: mime_type.unwrap_or_else(|| "image/jpeg".to_string()),
            prompt: prompt.unwrap_or_else(|| prompts::DEFAULT_EDIT.trim().to_string()),
        }
    }
}

/// Successful result of an edit call: either edited image bytes with
/// their mime type, or a text answer when the model declined to return
/// an image.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Image { bytes: Vec<u8>, mime_type: String },
    Text { content: String },
}

/// How the upstream generation endpoint is invoked.
///
/// Upstream response framing has been inconsistent across API revisions,
/// so both a buffered call and an incremental streamed call are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Buffered,
    Streaming,
}

impl Transport {
    pub fn parse(value: &str) -> crate::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "buffered" => Ok(Transport::Buffered),
            "streaming" => Ok(Transport::Streaming),
            other => Err(crate::Error::Config(format!(
                "Unknown transport '{}'. Expected 'buffered' or 'streaming'",
                other
            ))),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub edit_model: String,
    pub transport: Transport,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .map_err(|_| crate::Error::Config("GEMINI_API_KEY not set".to_string()))?,
            edit_model: std::env::var("EDIT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
            transport: match std::env::var("EDIT_TRANSPORT") {
                Ok(value) => Transport::parse(&value)?,
                Err(_) => Transport::Buffered,
            },
        })
    }
}
