//! Response framing for the Gemini generation endpoints.
//!
//! The upstream API has shipped the same logical payload under three
//! framings across revisions: one buffered JSON envelope, NDJSON (a JSON
//! array or newline-separated envelopes), and SSE `data:` lines. Framing
//! is detected per response instead of assumed, and every parser yields
//! the same chunk type so the reduction step does not care which one ran.

use super::types::{GenerateContentResponse, Part};
use crate::models::EditOutcome;
use crate::{Error, Result};

/// Named parser strategies for the upstream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// One JSON object with a `candidates` array.
    Json,
    /// A JSON array of envelopes, or one envelope per line.
    Ndjson,
    /// `data:`-prefixed lines, blank-line delimited.
    Sse,
}

impl WireFormat {
    /// Pick a parser from the declared content type, falling back to the
    /// shape of the body when the content type is absent or generic.
    pub fn detect(content_type: Option<&str>, body: &str) -> Self {
        if let Some(content_type) = content_type {
            let content_type = content_type.to_ascii_lowercase();
            if content_type.contains("text/event-stream") {
                return WireFormat::Sse;
            }
            if content_type.contains("ndjson") || content_type.contains("jsonl") {
                return WireFormat::Ndjson;
            }
        }

        let trimmed = body.trim_start();
        if trimmed.starts_with("data:") {
            return WireFormat::Sse;
        }
        if trimmed.starts_with('[') {
            return WireFormat::Ndjson;
        }

        // Multiple lines only mean NDJSON when each line is a complete
        // document; a pretty-printed envelope is still one JSON object.
        let mut non_empty = body.lines().filter(|line| !line.trim().is_empty());
        match (non_empty.next(), non_empty.next()) {
            (Some(first), Some(_))
                if serde_json::from_str::<serde::de::IgnoredAny>(first).is_ok() =>
            {
                WireFormat::Ndjson
            }
            _ => WireFormat::Json,
        }
    }
}

/// Parse a buffered body into chunks according to `format`.
///
/// A malformed single-envelope body is a hard parse error; a malformed
/// line inside NDJSON/SSE framing only drops that line.
pub fn parse_body(format: WireFormat, body: &str) -> Result<Vec<GenerateContentResponse>> {
    match format {
        WireFormat::Json => {
            let chunk: GenerateContentResponse = serde_json::from_str(body)
                .map_err(|e| Error::ResponseParse(format!("invalid response envelope: {}", e)))?;
            Ok(vec![chunk])
        }
        WireFormat::Ndjson => {
            let trimmed = body.trim_start();
            if trimmed.starts_with('[') {
                serde_json::from_str::<Vec<GenerateContentResponse>>(body).map_err(|e| {
                    Error::ResponseParse(format!("invalid response array: {}", e))
                })
            } else {
                Ok(body.lines().filter_map(parse_stream_line).collect())
            }
        }
        WireFormat::Sse => Ok(body.lines().filter_map(parse_stream_line).collect()),
    }
}

/// Parse one streamed line into a chunk.
///
/// Accepts both SSE `data:`-prefixed lines and bare NDJSON lines. Blank
/// delimiter lines yield nothing; a line that fails to parse as JSON is
/// skipped with a log entry rather than aborting the stream.
pub fn parse_stream_line(line: &str) -> Option<GenerateContentResponse> {
    let payload = match line.trim().strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => line.trim(),
    };
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            tracing::warn!("Skipping malformed stream chunk: {}", e);
            None
        }
    }
}

/// Reassembles complete lines from a streamed byte body.
///
/// Bytes arrive in transport-sized pieces that do not respect line
/// boundaries; `push` returns every line completed by the new piece and
/// `finish` drains whatever trails the last newline.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buf.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            lines.push(
                line.trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string(),
            );
        }
        lines
    }

    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

/// Pure fold over a finite sequence of chunks.
///
/// Accumulates base64 image fragments and text fragments in arrival
/// order (traversal: response, candidates, content, parts). The final
/// decision prefers any image over accumulated text.
#[derive(Debug, Default)]
pub struct ChunkFold {
    image_base64: String,
    image_mime: Option<String>,
    seen_inline: bool,
    text: String,
}

impl ChunkFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, chunk: &GenerateContentResponse) {
        for candidate in &chunk.candidates {
            for part in &candidate.content.parts {
                match part {
                    Part::Text { text } => self.text.push_str(text),
                    Part::InlineData { inline_data } => {
                        // Mime type comes from the first inline fragment only.
                        if !self.seen_inline {
                            self.seen_inline = true;
                            self.image_mime = inline_data.mime_type.clone();
                        }
                        self.image_base64.push_str(&inline_data.data);
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Result<EditOutcome> {
        if !self.image_base64.is_empty() {
            use base64::Engine as _;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&self.image_base64)
                .map_err(|e| Error::ImageDecode(e.to_string()))?;
            return Ok(EditOutcome::Image {
                bytes,
                mime_type: self.image_mime.unwrap_or_else(|| "image/png".to_string()),
            });
        }

        let text = self.text.trim();
        if !text.is_empty() {
            return Ok(EditOutcome::Text {
                content: text.to_string(),
            });
        }

        Err(Error::NoContent)
    }
}
