use super::client::{map_transport_error, GeminiHttpClient};
use super::types::{Content, InlineData, Part};
use super::wire::{self, ChunkFold, LineBuffer, WireFormat};
use crate::ai::ImageEditService;
use crate::models::{EditOutcome, EditRequest, Transport};
use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EditContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: EditGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditGenerationConfig {
    response_modalities: Vec<String>,
}

// Image generation regularly runs close to a minute upstream.
const EDIT_TIMEOUT: Duration = Duration::from_secs(90);

/// Gemini-backed image editor.
///
/// Sends one user message holding the inline upload and the edit prompt,
/// asks for both image and text modalities, and reduces whatever framing
/// the configured transport returns into a single outcome.
pub struct GeminiEditClient {
    http: GeminiHttpClient,
    transport: Transport,
}

impl GeminiEditClient {
    pub fn new(api_key: String, model: String, transport: Transport) -> Self {
        Self::new_with_client(api_key, model, transport, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        transport: Transport,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, EDIT_TIMEOUT, client),
            transport,
        }
    }

    fn build_request(request: &EditRequest) -> EditContentRequest {
        use base64::Engine as _;
        let base64_image = base64::engine::general_purpose::STANDARD.encode(&request.image);

        EditContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                // Part order is part of the contract: image first, prompt second.
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: Some(request.mime_type.clone()),
                            data: base64_image,
                        },
                    },
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
            generation_config: EditGenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }

    async fn collect_buffered(&self, payload: &EditContentRequest) -> Result<ChunkFold> {
        let raw = self.http.generate_content(payload).await?;

        let format = WireFormat::detect(raw.content_type.as_deref(), &raw.body);
        tracing::debug!("Parsing buffered edit response as {:?}", format);

        let mut fold = ChunkFold::new();
        for chunk in wire::parse_body(format, &raw.body)? {
            fold.absorb(&chunk);
        }
        Ok(fold)
    }

    async fn collect_streamed(&self, payload: &EditContentRequest) -> Result<ChunkFold> {
        let response = self.http.stream_generate_content(payload).await?;

        let mut fold = ChunkFold::new();
        let mut lines = LineBuffer::new();
        let mut body = response.bytes_stream();

        while let Some(piece) = body.next().await {
            let piece = piece.map_err(map_transport_error)?;
            for line in lines.push(&piece) {
                if let Some(chunk) = wire::parse_stream_line(&line) {
                    fold.absorb(&chunk);
                }
            }
        }
        if let Some(line) = lines.finish() {
            if let Some(chunk) = wire::parse_stream_line(&line) {
                fold.absorb(&chunk);
            }
        }

        Ok(fold)
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiEditClient);

#[async_trait]
impl ImageEditService for GeminiEditClient {
    async fn edit_image(&self, request: &EditRequest) -> Result<EditOutcome> {
        if request.image.is_empty() {
            return Err(Error::Input("No image provided".to_string()));
        }

        tracing::debug!(
            "Editing image ({} bytes, {}) via Gemini, prompt: {}",
            request.image.len(),
            request.mime_type,
            request.prompt
        );

        let payload = Self::build_request(request);

        let fold = match self.transport {
            Transport::Buffered => self.collect_buffered(&payload).await?,
            Transport::Streaming => self.collect_streamed(&payload).await?,
        };

        fold.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use base64::Engine as _;
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

    fn make_client(server: &MockServer, transport: Transport) -> GeminiEditClient {
        GeminiEditClient::new("test-key".to_string(), DEFAULT_MODEL.to_string(), transport)
            .with_base_url(server.uri())
    }

    fn jpeg_request(prompt: &str) -> EditRequest {
        EditRequest::new(
            vec![0xFF, 0xD8, 0xFF, 0xE0],
            Some("image/jpeg".to_string()),
            Some(prompt.to_string()),
        )
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_build_request_orders_image_before_text() {
        let payload = GeminiEditClient::build_request(&jpeg_request("make it vivid"));
        let json = serde_json::to_string(&payload).unwrap();

        let image_at = json.find("inlineData").unwrap();
        let text_at = json.find("make it vivid").unwrap();
        assert!(image_at < text_at);
        assert!(json.contains("\"responseModalities\":[\"IMAGE\",\"TEXT\"]"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[tokio::test]
    async fn test_buffered_single_inline_fragment_decodes_to_image() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(wiremock::matchers::body_string_contains("\"inlineData\""))
            .and(wiremock::matchers::body_string_contains("\"mimeType\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": b64(b"PNGBYTES")
                            }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let outcome = client.edit_image(&jpeg_request("make it vivid")).await.unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Image {
                bytes: b"PNGBYTES".to_vec(),
                mime_type: "image/png".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_buffered_text_only_response() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "  I was unable to generate an image. " }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let outcome = client.edit_image(&jpeg_request("redo it")).await.unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Text {
                content: "I was unable to generate an image.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_buffered_ndjson_array_body_flattens_candidates() {
        let server = MockServer::start().await;
        let encoded = b64(b"WEBPBYTES");
        let (first, second) = encoded.split_at(4);

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "[{},{}]",
                serde_json::json!({
                    "candidates": [{ "content": { "parts": [{
                        "inlineData": { "mimeType": "image/webp", "data": first }
                    }] } }]
                }),
                serde_json::json!({
                    "candidates": [{ "content": { "parts": [{
                        "inlineData": { "data": second }
                    }] } }]
                }),
            )))
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let outcome = client.edit_image(&jpeg_request("sharpen")).await.unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Image {
                bytes: b"WEBPBYTES".to_vec(),
                mime_type: "image/webp".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_streamed_fragments_reassemble_in_order() {
        let server = MockServer::start().await;
        let encoded = b64(b"a large generated png split across events");
        let (first, second) = encoded.split_at(8);

        let sse_body = format!(
            "data: {}\n\ndata: {}\n\n",
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{
                    "inlineData": { "mimeType": "image/png", "data": first }
                }] } }]
            }),
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{
                    "inlineData": { "data": second }
                }] } }]
            }),
        );

        test_support::post_path_regex(test_support::STREAM_GENERATE_CONTENT_PATH_REGEX)
            .and(wiremock::matchers::query_param("alt", "sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body),
            )
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Streaming);
        let outcome = client.edit_image(&jpeg_request("enhance")).await.unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Image {
                bytes: b"a large generated png split across events".to_vec(),
                mime_type: "image/png".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_streamed_malformed_chunk_does_not_abort() {
        let server = MockServer::start().await;

        let sse_body = format!(
            "data: {}\n\ndata: this is not json\n\ndata: {}\n\n",
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "the dish " }] } }]
            }),
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "looks great" }] } }]
            }),
        );

        test_support::post_path_regex(test_support::STREAM_GENERATE_CONTENT_PATH_REGEX)
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body),
            )
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Streaming);
        let outcome = client.edit_image(&jpeg_request("enhance")).await.unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Text {
                content: "the dish looks great".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_image_fails_without_outbound_call() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let empty = EditRequest::new(Vec::new(), None, None);

        let err = client.edit_image(&empty).await.unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_upstream_429_is_relayed_with_body() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({ "error": "rate limited" })),
            )
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let err = client.edit_image(&jpeg_request("vivid")).await.unwrap_err();

        assert_eq!(err.status(), 429);
        let message = err.to_string();
        assert!(message.contains("429"));
        assert!(message.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_response_without_content_is_no_content_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let err = client.edit_image(&jpeg_request("vivid")).await.unwrap_err();

        assert!(matches!(err, Error::NoContent));
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn test_bad_generated_base64_is_decode_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": "!!!invalid-base64!!!"
                            }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, Transport::Buffered);
        let err = client.edit_image(&jpeg_request("vivid")).await.unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }
}
