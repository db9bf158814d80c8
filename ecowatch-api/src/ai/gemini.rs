//! Gemini API client
//!
//! Calls `models/{model}:streamGenerateContent` and buffers every streamed
//! chunk into a single string. No retries; a timeout only applies when one is
//! configured.

use base64::{engine::general_purpose, Engine as _};
use ecowatch_common::config::GeminiConfig;
use serde::{Deserialize, Serialize};

use super::{AiError, GenerationRequest, GenerativeModel};

const USER_AGENT: &str = concat!("EcoWatch/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    /// Base64 (standard alphabet) image bytes
    data: String,
}

/// One element of the streamed response array
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// The endpoint answers with an array of chunks; a single object is tolerated
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamBody {
    Chunks(Vec<ResponseChunk>),
    Single(ResponseChunk),
}

impl StreamBody {
    fn into_chunks(self) -> Vec<ResponseChunk> {
        match self {
            StreamBody::Chunks(chunks) => chunks,
            StreamBody::Single(chunk) => vec![chunk],
        }
    }
}

/// Concatenate the first candidate's text parts across all chunks
fn collect_text(chunks: &[ResponseChunk]) -> Result<String, AiError> {
    let text: String = chunks
        .iter()
        .filter_map(|chunk| chunk.candidates.first())
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if !text.is_empty() {
        return Ok(text);
    }

    let block_reason = chunks
        .iter()
        .filter_map(|chunk| chunk.prompt_feedback.as_ref())
        .find_map(|feedback| feedback.block_reason.clone());

    match block_reason {
        Some(reason) => Err(AiError::Blocked(reason)),
        None => Err(AiError::EmptyResponse),
    }
}

// ============================================================================
// Client
// ============================================================================

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build the client; a missing API key is reported per call, not here
    pub fn new(config: &GeminiConfig) -> Result<Self, AiError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            self.base_url, self.model
        )
    }
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    let mut parts = vec![Part::Text {
        text: &request.prompt,
    }];
    if let Some(image) = &request.image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: general_purpose::STANDARD.encode(&image.data),
            },
        });
    }

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text {
                text: &request.system_instruction,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
    }
}

#[async_trait::async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let body = build_request_body(&request);

        tracing::debug!(
            model = %self.model,
            prompt_bytes = request.prompt.len(),
            image_bytes = request.image.as_ref().map(|i| i.data.len()).unwrap_or(0),
            "Calling Gemini streamGenerateContent"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::ApiError(status.as_u16(), error_text));
        }

        let stream: StreamBody = response
            .json()
            .await
            .map_err(|e| AiError::ParseError(e.to_string()))?;
        let chunks = stream.into_chunks();

        let text = collect_text(&chunks)?;
        tracing::debug!(chunks = chunks.len(), chars = text.len(), "Gemini response buffered");

        Ok(text)
    }
}
