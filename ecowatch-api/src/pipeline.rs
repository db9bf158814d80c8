//! Per-report processing state machine
//!
//! ```text
//! Verifying ─┬─ failure ─────────────────────────────→ Done(VerificationFailed)
//!            └─ Scoring ─┬─ failure ─────────────────→ Done(ScoringFailed)
//!                        └─ Persisting ──────────────→ Done(Persisted)
//! ```
//!
//! Analysis failures end the run as data. Persistence faults propagate to the
//! caller; writes are sequential and not rolled back, so a fault after the
//! report insert leaves the earlier records in place. No stage is retried.

use ecowatch_common::models::{AnalysisFailure, Report, ScoreResult, VerificationResult};
use ecowatch_common::Result;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::ReportAnalyzer;
use crate::store::images::image_key;
use crate::store::{ImageStore, ReportStore};

/// Message returned with every processed upload
pub const SUCCESS_MESSAGE: &str = "Data processed successfully.";

/// Marker placed in `final_score` when verification failed
pub const SCORING_SKIPPED_MESSAGE: &str = "Scoring skipped due to initial analysis failure.";

/// Pipeline states, carrying what each transition produced
enum ReportStage {
    Verifying,
    Scoring(VerificationResult),
    Persisting(VerificationResult, ScoreResult),
    Done(ReportOutcome),
}

impl ReportStage {
    fn name(&self) -> &'static str {
        match self {
            ReportStage::Verifying => "verifying",
            ReportStage::Scoring(_) => "scoring",
            ReportStage::Persisting(..) => "persisting",
            ReportStage::Done(_) => "done",
        }
    }
}

/// Terminal outcome of one report
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    VerificationFailed {
        failure: AnalysisFailure,
    },
    ScoringFailed {
        verification: VerificationResult,
        failure: AnalysisFailure,
    },
    Persisted {
        report_id: Uuid,
        verification: VerificationResult,
        score: ScoreResult,
        points_total: i64,
    },
}

/// Drives one report through verification, scoring and persistence
pub struct ReportPipeline<'a> {
    analyzer: &'a ReportAnalyzer,
    store: &'a dyn ReportStore,
    images: &'a dyn ImageStore,
}

impl<'a> ReportPipeline<'a> {
    pub fn new(
        analyzer: &'a ReportAnalyzer,
        store: &'a dyn ReportStore,
        images: &'a dyn ImageStore,
    ) -> Self {
        Self {
            analyzer,
            store,
            images,
        }
    }

    /// Run the state machine to completion
    pub async fn run(&self, report: Report) -> Result<ReportOutcome> {
        let mut stage = ReportStage::Verifying;

        loop {
            debug!(uid = %report.uid, stage = stage.name(), "Report stage");

            stage = match stage {
                ReportStage::Verifying => match self.analyzer.verify(&report).await {
                    Ok(verification) => ReportStage::Scoring(verification),
                    Err(failure) => {
                        warn!(uid = %report.uid, "Verification failed; scoring skipped");
                        ReportStage::Done(ReportOutcome::VerificationFailed { failure })
                    }
                },
                ReportStage::Scoring(verification) => match self
                    .analyzer
                    .score(&verification, &report.description, &report.category)
                    .await
                {
                    Ok(score) => ReportStage::Persisting(verification, score),
                    Err(failure) => ReportStage::Done(ReportOutcome::ScoringFailed {
                        verification,
                        failure,
                    }),
                },
                ReportStage::Persisting(verification, score) => {
                    let (report_id, points_total) =
                        self.persist(&report, &verification, &score).await?;
                    ReportStage::Done(ReportOutcome::Persisted {
                        report_id,
                        verification,
                        score,
                        points_total,
                    })
                }
                ReportStage::Done(outcome) => return Ok(outcome),
            };
        }
    }

    async fn persist(
        &self,
        report: &Report,
        verification: &VerificationResult,
        score: &ScoreResult,
    ) -> Result<(Uuid, i64)> {
        let report_id = Uuid::new_v4();

        let image_url = self
            .images
            .put(&image_key(report_id, &report.image), &report.image)
            .await?;
        self.store.create_report(report_id, report, &image_url).await?;
        self.store.create_verification(report_id, verification).await?;
        self.store.create_score(report_id, &report.uid, score).await?;
        let points_total = self.store.add_points(&report.uid, score.total_score).await?;

        info!(
            report_id = %report_id,
            uid = %report.uid,
            total_score = score.total_score,
            points_total,
            "Report persisted"
        );

        Ok((report_id, points_total))
    }
}

// ============================================================================
// Response body
// ============================================================================

/// `initial_analysis`: the verification or its failure
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VerificationField {
    Verified(VerificationResult),
    Failed(AnalysisFailure),
}

/// Explicit marker for a scoring stage that never ran
#[derive(Debug, Clone, Serialize)]
pub struct ScoringSkipped {
    pub error: &'static str,
    pub skipped: bool,
}

/// `final_score`: the score, its failure, or the skip marker
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScoreField {
    Scored(ScoreResult),
    Failed(AnalysisFailure),
    Skipped(ScoringSkipped),
}

/// 200 body for `POST /upload`
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_total: Option<i64>,
    pub initial_analysis: VerificationField,
    pub final_score: ScoreField,
}

impl From<ReportOutcome> for UploadResponse {
    fn from(outcome: ReportOutcome) -> Self {
        match outcome {
            ReportOutcome::VerificationFailed { failure } => Self {
                message: SUCCESS_MESSAGE,
                report_id: None,
                points_total: None,
                initial_analysis: VerificationField::Failed(failure),
                final_score: ScoreField::Skipped(ScoringSkipped {
                    error: SCORING_SKIPPED_MESSAGE,
                    skipped: true,
                }),
            },
            ReportOutcome::ScoringFailed {
                verification,
                failure,
            } => Self {
                message: SUCCESS_MESSAGE,
                report_id: None,
                points_total: None,
                initial_analysis: VerificationField::Verified(verification),
                final_score: ScoreField::Failed(failure),
            },
            ReportOutcome::Persisted {
                report_id,
                verification,
                score,
                points_total,
            } => Self {
                message: SUCCESS_MESSAGE,
                report_id: Some(report_id),
                points_total: Some(points_total),
                initial_analysis: VerificationField::Verified(verification),
                final_score: ScoreField::Scored(score),
            },
        }
    }
}
