use super::ImageEditService;
use crate::models::{EditOutcome, EditRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted stand-in for the Gemini edit client.
///
/// Queued outcomes are replayed in order (cycling when exhausted); with
/// no queue it returns a tiny valid PNG. Clones share state so tests can
/// probe call counts after handing the mock to an `App`.
#[derive(Clone)]
pub struct MockEditClient {
    outcomes: Arc<Mutex<Vec<Result<EditOutcome>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockEditClient {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_image_outcome(self, bytes: Vec<u8>, mime_type: &str) -> Self {
        self.outcomes.lock().unwrap().push(Ok(EditOutcome::Image {
            bytes,
            mime_type: mime_type.to_string(),
        }));
        self
    }

    pub fn with_text_outcome(self, content: &str) -> Self {
        self.outcomes.lock().unwrap().push(Ok(EditOutcome::Text {
            content: content.to_string(),
        }));
        self
    }

    pub fn with_error_outcome(self, error: Error) -> Self {
        self.outcomes.lock().unwrap().push(Err(error));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockEditClient {
    fn default() -> Self {
        Self::new()
    }
}

fn clone_outcome(outcome: &Result<EditOutcome>) -> Result<EditOutcome> {
    match outcome {
        Ok(value) => Ok(value.clone()),
        // Error is not Clone; rebuild the variants tests actually queue.
        Err(Error::Input(msg)) => Err(Error::Input(msg.clone())),
        Err(Error::UpstreamHttp { status, message }) => Err(Error::UpstreamHttp {
            status: *status,
            message: message.clone(),
        }),
        Err(Error::UpstreamTimeout) => Err(Error::UpstreamTimeout),
        Err(Error::UpstreamConnection(msg)) => Err(Error::UpstreamConnection(msg.clone())),
        Err(Error::ResponseParse(msg)) => Err(Error::ResponseParse(msg.clone())),
        Err(Error::ImageDecode(msg)) => Err(Error::ImageDecode(msg.clone())),
        Err(Error::NoContent) => Err(Error::NoContent),
        Err(other) => Err(Error::Config(format!("mock error: {}", other))),
    }
}

#[async_trait]
impl ImageEditService for MockEditClient {
    async fn edit_image(&self, request: &EditRequest) -> Result<EditOutcome> {
        if request.image.is_empty() {
            return Err(Error::Input("No image provided".to_string()));
        }

        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            // Return a tiny valid PNG as default
            Ok(EditOutcome::Image {
                bytes: vec![
                    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
                    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
                    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
                    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C,
                    0x49, 0x44, 0x41, // IDAT chunk
                    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01,
                    0xE2, 0x25, 0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND
                    0x44, 0xAE, 0x42, 0x60, 0x82,
                ],
                mime_type: "image/png".to_string(),
            })
        } else {
            let index = (*count - 1) % outcomes.len();
            clone_outcome(&outcomes[index])
        }
    }
}
