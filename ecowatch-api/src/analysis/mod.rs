//! Report analysis: verification then scoring
//!
//! Both stages return `Result<_, AnalysisFailure>`. Every fault (missing key,
//! network, HTTP status, malformed JSON, rubric violation) is logged and
//! converted into an [`AnalysisFailure`] so callers branch on the result
//! instead of handling individual error types.

pub mod prompts;
pub mod response;

use ecowatch_common::models::{
    AnalysisFailure, ModelScore, Report, RubricViolation, ScoreResult, VerificationResult,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::ai::{AiError, GenerationRequest, GenerativeModel, InlineImage};
use prompts::{SCORING_INSTRUCTION, VERIFICATION_INSTRUCTION};
use response::parse_model_json;

/// Client-facing message for a failed verification
pub const ANALYSIS_ERROR_MESSAGE: &str = "An error occurred during AI analysis.";

/// Client-facing message for a failed scoring
pub const SCORING_ERROR_MESSAGE: &str = "An error occurred during AI scoring.";

/// Internal analysis fault, before conversion to [`AnalysisFailure`]
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] AiError),

    #[error("Prompt encoding failed: {0}")]
    Prompt(serde_json::Error),

    #[error("Malformed model response: {0}")]
    Malformed(serde_json::Error),

    #[error("Score outside rubric: {0}")]
    Rubric(#[from] RubricViolation),
}

/// Runs the verification and scoring prompts against a generative model
pub struct ReportAnalyzer {
    model: Arc<dyn GenerativeModel>,
}

impl ReportAnalyzer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Judge location plausibility and photo/category consistency
    pub async fn verify(&self, report: &Report) -> Result<VerificationResult, AnalysisFailure> {
        let started = Instant::now();

        match self.try_verify(report).await {
            Ok(result) => {
                info!(
                    model = self.model.name(),
                    location = %result.location_verification,
                    image = %result.image_category_verification,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Verification complete"
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    model = self.model.name(),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Verification failed"
                );
                Err(AnalysisFailure::new(ANALYSIS_ERROR_MESSAGE, e))
            }
        }
    }

    /// Apply the scoring rubric to a verification result
    ///
    /// The image is not sent; the score derives from the verification and the
    /// report's text fields only.
    pub async fn score(
        &self,
        verification: &VerificationResult,
        description: &str,
        category: &str,
    ) -> Result<ScoreResult, AnalysisFailure> {
        let started = Instant::now();

        match self.try_score(verification, description, category).await {
            Ok(score) => {
                info!(
                    model = self.model.name(),
                    total_score = score.total_score,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scoring complete"
                );
                Ok(score)
            }
            Err(e) => {
                error!(
                    model = self.model.name(),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scoring failed"
                );
                Err(AnalysisFailure::new(SCORING_ERROR_MESSAGE, e))
            }
        }
    }

    async fn try_verify(&self, report: &Report) -> Result<VerificationResult, AnalysisError> {
        let prompt = prompts::verification_prompt(report).map_err(AnalysisError::Prompt)?;

        let text = self
            .model
            .generate(GenerationRequest {
                system_instruction: VERIFICATION_INSTRUCTION.to_string(),
                prompt,
                image: Some(InlineImage {
                    mime_type: report.image.content_type.clone(),
                    data: report.image.bytes.clone(),
                }),
            })
            .await?;
        debug!(response = %text, "Raw verification response");

        parse_model_json(&text).map_err(AnalysisError::Malformed)
    }

    async fn try_score(
        &self,
        verification: &VerificationResult,
        description: &str,
        category: &str,
    ) -> Result<ScoreResult, AnalysisError> {
        let prompt = prompts::scoring_prompt(verification, description, category)
            .map_err(AnalysisError::Prompt)?;

        let text = self
            .model
            .generate(GenerationRequest {
                system_instruction: SCORING_INSTRUCTION.to_string(),
                prompt,
                image: None,
            })
            .await?;
        debug!(response = %text, "Raw scoring response");

        let raw: ModelScore = parse_model_json(&text).map_err(AnalysisError::Malformed)?;
        Ok(raw.into_score()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecowatch_common::models::{ImageCategoryVerification, ImageUpload, LocationVerification};
    use std::sync::Mutex;

    /// Returns queued responses in order and records each request
    struct QueuedModel {
        responses: Mutex<Vec<Result<String, AiError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl QueuedModel {
        fn new(responses: Vec<Result<String, AiError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl GenerativeModel for QueuedModel {
        fn name(&self) -> &str {
            "queued"
        }

        async fn generate(&self, request: GenerationRequest) -> Result<String, AiError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(AiError::EmptyResponse))
        }
    }

    fn report() -> Report {
        Report {
            uid: "user-1".to_string(),
            category: "Illegal Cutting".to_string(),
            description: "Tree stumps visible near shoreline".to_string(),
            latitude: 9.96,
            longitude: 76.24,
            image: ImageUpload {
                bytes: vec![0xff, 0xd8, 0xff],
                content_type: "image/jpeg".to_string(),
                file_name: Some("site.jpg".to_string()),
            },
        }
    }

    const VERIFICATION_JSON: &str = r#"```json
{
 "location_verification": "Location Verified",
 "location_confidence": "92%",
 "image_category_verification": "Consistent",
 "category_confidence": "81%",
 "location_remarks": "Vembanad estuary",
 "category_remarks": "Cut stumps visible"
}
```"#;

    #[tokio::test]
    async fn test_verify_parses_fenced_response_and_sends_image() {
        let model = QueuedModel::new(vec![Ok(VERIFICATION_JSON.to_string())]);
        let analyzer = ReportAnalyzer::new(model.clone());

        let result = analyzer.verify(&report()).await.unwrap();
        assert_eq!(result.location_verification, LocationVerification::Verified);
        assert_eq!(result.image_category_verification, ImageCategoryVerification::Consistent);
        assert_eq!(result.location_confidence.value(), 92);

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_instruction, VERIFICATION_INSTRUCTION);
        let image = requests[0].image.as_ref().unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, vec![0xff, 0xd8, 0xff]);
    }

    #[tokio::test]
    async fn test_verify_malformed_json_becomes_failure() {
        let model = QueuedModel::new(vec![Ok("Sorry, I cannot see the image.".to_string())]);
        let analyzer = ReportAnalyzer::new(model);

        let failure = analyzer.verify(&report()).await.unwrap_err();
        assert_eq!(failure.error, ANALYSIS_ERROR_MESSAGE);
        assert!(failure.details.starts_with("Malformed model response"));
    }

    #[tokio::test]
    async fn test_verify_model_error_becomes_failure() {
        let model = QueuedModel::new(vec![Err(AiError::MissingApiKey)]);
        let analyzer = ReportAnalyzer::new(model);

        let failure = analyzer.verify(&report()).await.unwrap_err();
        assert_eq!(failure.error, ANALYSIS_ERROR_MESSAGE);
        assert!(failure.details.contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_verify_unknown_enum_value_becomes_failure() {
        let body = VERIFICATION_JSON.replace("Consistent", "Probably");
        let model = QueuedModel::new(vec![Ok(body)]);
        let analyzer = ReportAnalyzer::new(model);

        assert!(analyzer.verify(&report()).await.is_err());
    }

    #[tokio::test]
    async fn test_score_has_no_image_and_sums_total() {
        let verification: VerificationResult =
            parse_model_json(VERIFICATION_JSON).unwrap();
        let model = QueuedModel::new(vec![Ok(r#"{"image_score": 45, "description_score": 16,
            "category_score": 9, "geo_score": 9, "bonus": 5, "total_score": 84,
            "remarks": "Clear evidence"}"#
            .to_string())]);
        let analyzer = ReportAnalyzer::new(model.clone());

        let score = analyzer
            .score(&verification, "Tree stumps visible near shoreline", "Illegal Cutting")
            .await
            .unwrap();

        assert_eq!(score.total_score, 84);
        assert_eq!(
            score.image_score + score.description_score + score.category_score + score.geo_score + score.bonus,
            score.total_score
        );

        let requests = model.requests.lock().unwrap();
        assert!(requests[0].image.is_none());
        assert_eq!(requests[0].system_instruction, SCORING_INSTRUCTION);
        assert!(requests[0].prompt.contains("Illegal Cutting"));
    }

    #[tokio::test]
    async fn test_score_rubric_violation_becomes_failure() {
        let verification: VerificationResult =
            parse_model_json(VERIFICATION_JSON).unwrap();
        let model = QueuedModel::new(vec![Ok(r#"{"image_score": 45, "description_score": 16,
            "category_score": 9, "geo_score": 9, "bonus": 25}"#
            .to_string())]);
        let analyzer = ReportAnalyzer::new(model);

        let failure = analyzer
            .score(&verification, "desc", "Illegal Cutting")
            .await
            .unwrap_err();

        assert_eq!(failure.error, SCORING_ERROR_MESSAGE);
        assert!(failure.details.contains("bonus"));
    }
}
