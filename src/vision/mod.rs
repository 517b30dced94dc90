//! Vision analysis — turns image bytes into a free-text description.
//!
//! The [`VisionAnalyzer`] trait is the seam the pipeline depends on;
//! [`OpenAiVision`] is the production implementation (chat completions
//! with an inline base64 data URL).

pub mod openai;
pub mod prompts;

pub use openai::OpenAiVision;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::VisionError;

/// Default vision model.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Default OpenAI API base.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// An image handed to the analyzer.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: &'static str) -> Self {
        Self { bytes, mime_type }
    }
}

/// Something that can describe an image in natural language.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Provider label for logs.
    fn provider_name(&self) -> &str;

    /// Describe the image. An empty description is an error.
    async fn analyze(&self, image: ImageInput) -> Result<String, VisionError>;
}

/// Configuration for creating a vision analyzer.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: String,
}

impl VisionConfig {
    pub fn new(api_key: secrecy::SecretString) -> Self {
        Self {
            api_key,
            model: DEFAULT_VISION_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Create the vision analyzer from configuration.
pub fn create_analyzer(config: &VisionConfig) -> Arc<dyn VisionAnalyzer> {
    tracing::info!("Using OpenAI vision (model: {})", config.model);
    Arc::new(OpenAiVision::new(config.clone()))
}

/// Run `analyze` on its own task, bounded by `timeout`.
///
/// The analysis is awaited before returning; the spawned task keeps the
/// request off the caller's task.
pub async fn analyze_detached(
    analyzer: Arc<dyn VisionAnalyzer>,
    image: ImageInput,
    timeout: Duration,
) -> Result<String, VisionError> {
    let handle = tokio::spawn(async move { analyzer.analyze(image).await });
    let abort = handle.abort_handle();

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(VisionError::TaskAborted(join_err.to_string())),
        Err(_) => {
            abort.abort();
            Err(VisionError::Timeout(timeout))
        }
    }
}

/// MIME type for an attachment: the declared content type when it is one
/// of the supported image types, otherwise by extension. Unknown → JPEG.
pub fn mime_type_for(content_type: Option<&str>, filename: &str) -> &'static str {
    if let Some(mime) = content_type.and_then(supported_mime) {
        return mime;
    }
    match std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Normalise a declared content type (`image/PNG; charset=...`).
fn supported_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_lowercase();
    match essence.as_str() {
        "image/png" => Some("image/png"),
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/gif" => Some("image/gif"),
        "image/webp" => Some("image/webp"),
        _ => None,
    }
}
