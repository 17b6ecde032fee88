use crate::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST client used by the edit module.
///
/// Exposes both the buffered `generateContent` call and the SSE-framed
/// `streamGenerateContent` call; which one a request uses is decided by
/// the caller's configured transport.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

/// Buffered upstream reply: declared content type (used for framing
/// detection) plus the raw body.
#[derive(Debug)]
pub struct RawResponse {
    pub content_type: Option<String>,
    pub body: String,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` should be the bare model ID (for example
    /// `gemini-2.5-flash-image`), not a `models/...`-prefixed path segment.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn post<Req: Serialize>(&self, url: String, request: &Req) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                map_transport_error(e)
            })?;

        if !response.status().is_success() {
            return Err(upstream_http_error(response).await);
        }

        Ok(response)
    }

    /// Calls `generateContent` and buffers the whole reply.
    ///
    /// The body is returned raw (not deserialized) because the framing is
    /// only known after inspecting the content type and body shape.
    pub async fn generate_content<Req: Serialize>(&self, request: &Req) -> Result<RawResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self.post(url, request).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(map_transport_error)?;

        Ok(RawResponse { content_type, body })
    }

    /// Calls `streamGenerateContent` with SSE framing requested and hands
    /// the open response back for incremental consumption.
    pub async fn stream_generate_content<Req: Serialize>(
        &self,
        request: &Req,
    ) -> Result<reqwest::Response> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        self.post(url, request).await
    }
}

/// Classify a reqwest failure into the caller-visible taxonomy.
pub(crate) fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::UpstreamTimeout
    } else if e.is_connect() {
        Error::UpstreamConnection(e.to_string())
    } else {
        Error::Http(e)
    }
}

/// Convert a non-200 upstream reply into an error carrying the exact
/// status. The message keeps the upstream JSON error body when it parses,
/// otherwise the first 500 characters of the raw body.
async fn upstream_http_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => json.to_string(),
        Err(_) => body.chars().take(500).collect(),
    };

    tracing::error!("Gemini API error (status {}): {}", status, detail);
    Error::UpstreamHttp {
        status: status.as_u16(),
        message: format!("Gemini API error (status {}): {}", status, detail),
    }
}
