//! AI service integration for image editing
//!
//! Provides the service seam for sending an uploaded image plus edit
//! prompt to a generative image API and getting back the edited image
//! or a text answer.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiEditClient;
pub use mock::MockEditClient;

use crate::models::{EditOutcome, EditRequest};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageEditService: Send + Sync {
    async fn edit_image(&self, request: &EditRequest) -> Result<EditOutcome>;
}
