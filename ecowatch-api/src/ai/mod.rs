//! Generative AI service access
//!
//! [`GenerativeModel`] is the seam between report analysis and the external
//! model. [`gemini::GeminiClient`] is the production implementation; tests
//! substitute canned or failing models.

pub mod gemini;

pub use gemini::GeminiClient;

use thiserror::Error;

/// Inline image sent alongside the prompt
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One generation call: system instruction, user prompt, optional image
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub image: Option<InlineImage>,
}

/// Generative model client errors
#[derive(Debug, Error)]
pub enum AiError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Prompt blocked by the model: {0}")]
    Blocked(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A text generation backend
///
/// Implementations return the complete response text; streamed responses are
/// buffered before returning.
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<String, AiError>;
}
