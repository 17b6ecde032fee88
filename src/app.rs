//! Application orchestration for one edit call: file in, outcome out.

use crate::ai::{mime, GeminiEditClient, ImageEditService};
use crate::models::{Config, EditOutcome, EditRequest};
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a run produced: a written image file, or the model's text answer.
#[derive(Debug, PartialEq)]
pub enum RunOutput {
    SavedImage(PathBuf),
    Text(String),
}

/// Coordinates reading the upload, calling the edit service, and
/// persisting the result.
pub struct App {
    edit: Box<dyn ImageEditService>,
}

impl App {
    /// Build an app from a concrete edit service.
    ///
    /// This is primarily useful for integration tests and local harnesses
    /// that need to inject mocks.
    pub fn with_service(edit: Box<dyn ImageEditService>) -> Self {
        Self { edit }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;

        info!(
            "Edit provider: Gemini (model: {}, transport: {:?})",
            config.edit_model, config.transport
        );

        let edit = Box::new(GeminiEditClient::new_with_client(
            config.gemini_api_key,
            config.edit_model,
            config.transport,
            reqwest::Client::new(),
        ));

        Ok(Self::with_service(edit))
    }

    /// Edit the image at `image_path` and either write the edited image
    /// next to it (or at `output`) or return the model's text answer.
    pub async fn run(
        &self,
        image_path: &Path,
        prompt: Option<String>,
        mime_type: Option<String>,
        output: Option<PathBuf>,
    ) -> Result<RunOutput> {
        let image = fs::read(image_path)?;
        let mime_type = mime_type.unwrap_or_else(|| mime::sniff_upload_mime(&image).to_string());

        let request = EditRequest::new(image, Some(mime_type), prompt);
        info!(
            "Submitting {} ({} bytes) for editing",
            image_path.display(),
            request.image.len()
        );

        match self.edit.edit_image(&request).await? {
            EditOutcome::Image { bytes, mime_type } => {
                let path =
                    output.unwrap_or_else(|| default_output_path(image_path, &mime_type));
                fs::write(&path, &bytes)?;
                info!(
                    "Wrote edited image ({} bytes, {}) to {}",
                    bytes.len(),
                    mime_type,
                    path.display()
                );
                Ok(RunOutput::SavedImage(path))
            }
            EditOutcome::Text { content } => {
                info!("Upstream answered with text instead of an image");
                Ok(RunOutput::Text(content))
            }
        }
    }
}

fn default_output_path(image_path: &Path, mime_type: &str) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("edited");
    image_path.with_file_name(format!("{}_edited.{}", stem, extension_for(mime_type)))
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        // Upstream defaults to PNG when it does not label the payload.
        _ => "png",
    }
}
