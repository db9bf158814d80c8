//! Persistence collaborators
//!
//! [`ReportStore`] holds report, verification and score documents plus the
//! per-submitter points total. [`ImageStore`] holds uploaded photos and hands
//! back a public URL. Both are injected into [`crate::AppState`] so tests and
//! alternative backends can replace the SQLite and filesystem defaults.

pub mod images;

pub use images::{FsImageStore, ImageStore, StoredImage};

use async_trait::async_trait;
use chrono::Utc;
use ecowatch_common::models::{Report, ScoreResult, VerificationResult};
use ecowatch_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;

/// Document store for reports and their derived records
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, id: Uuid, report: &Report, image_url: &str) -> Result<()>;

    async fn create_verification(
        &self,
        report_id: Uuid,
        verification: &VerificationResult,
    ) -> Result<()>;

    async fn create_score(&self, report_id: Uuid, uid: &str, score: &ScoreResult) -> Result<()>;

    /// Atomic increment of the submitter's running total; returns the new total
    async fn add_points(&self, uid: &str, delta: i64) -> Result<i64>;

    async fn points(&self, uid: &str) -> Result<Option<i64>>;
}

/// [`ReportStore`] backed by the SQLite tables in [`crate::db`]
#[derive(Clone)]
pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn create_report(&self, id: Uuid, report: &Report, image_url: &str) -> Result<()> {
        db::reports::insert_report(&self.pool, id, report, image_url, Utc::now()).await
    }

    async fn create_verification(
        &self,
        report_id: Uuid,
        verification: &VerificationResult,
    ) -> Result<()> {
        db::reports::insert_verification(&self.pool, report_id, verification, Utc::now()).await
    }

    async fn create_score(&self, report_id: Uuid, uid: &str, score: &ScoreResult) -> Result<()> {
        db::reports::insert_score(&self.pool, report_id, uid, score, Utc::now()).await
    }

    async fn add_points(&self, uid: &str, delta: i64) -> Result<i64> {
        db::users::add_points(&self.pool, uid, delta).await
    }

    async fn points(&self, uid: &str) -> Result<Option<i64>> {
        db::users::get_points(&self.pool, uid).await
    }
}
