use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tanya_core::errors::TurnError;
use tracing::debug;

use crate::llm::{ChatRequest, LlmClient};

/// Describes an attached image so its content can be routed like text.
pub struct ImageDescriber {
    llm: Option<Arc<dyn LlmClient>>,
    instruction: String,
}

impl ImageDescriber {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, instruction: impl Into<String>) -> Self {
        Self { llm, instruction: instruction.into() }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn describe(&self, image: &str) -> Result<String, TurnError> {
        let mime = validate_data_uri(image).map_err(TurnError::ImageAnalysis)?;
        let Some(llm) = &self.llm else {
            return Err(TurnError::ImageAnalysis("vision model is not configured".to_string()));
        };
        debug!(mime = %mime, bytes = image.len(), "describing attached image");

        let description = llm
            .complete(ChatRequest::with_image(&self.instruction, image))
            .await
            .map_err(|error| TurnError::ImageAnalysis(error.to_string()))?;
        let description = description.trim();
        if description.is_empty() {
            return Err(TurnError::ImageAnalysis("vision model returned no description".into()));
        }
        Ok(description.to_string())
    }
}

/// Checks a `data:<mime>;base64,<payload>` URI and returns its mime type.
pub fn validate_data_uri(uri: &str) -> Result<String, String> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| "image must be a data URI".to_string())?;
    let (header, payload) =
        rest.split_once(',').ok_or_else(|| "data URI has no payload".to_string())?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| "data URI must be base64 encoded".to_string())?;
    if !mime.starts_with("image/") {
        return Err(format!("unsupported media type `{mime}`"));
    }
    let decoded =
        STANDARD.decode(payload.trim()).map_err(|error| format!("invalid base64 payload: {error}"))?;
    if decoded.is_empty() {
        return Err("image payload is empty".to_string());
    }
    Ok(mime.to_string())
}

/// Text handed to the classifier once an image has been described.
pub fn merge_image_context(description: &str, message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        description.to_string()
    } else {
        format!("Context from image: {description}\n\nUser question: {message}")
    }
}
