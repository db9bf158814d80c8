//! Report, verification and score records
//!
//! Each write is a single statement; there is no transaction spanning the
//! three tables.

use chrono::{DateTime, Utc};
use ecowatch_common::models::{Report, ScoreResult, VerificationResult};
use ecowatch_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Insert the report document
pub async fn insert_report(
    pool: &SqlitePool,
    id: Uuid,
    report: &Report,
    image_url: &str,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reports (
            id, uid, category, description, latitude, longitude,
            image_url, image_content_type, image_file_name, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&report.uid)
    .bind(&report.category)
    .bind(&report.description)
    .bind(report.latitude)
    .bind(report.longitude)
    .bind(image_url)
    .bind(&report.image.content_type)
    .bind(report.image.file_name.as_deref())
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the verification document for a report
pub async fn insert_verification(
    pool: &SqlitePool,
    report_id: Uuid,
    verification: &VerificationResult,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO verifications (
            report_id, location_verification, location_confidence,
            image_category_verification, category_confidence,
            location_remarks, category_remarks, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report_id.to_string())
    .bind(verification.location_verification.as_str())
    .bind(i64::from(verification.location_confidence.value()))
    .bind(verification.image_category_verification.as_str())
    .bind(i64::from(verification.category_confidence.value()))
    .bind(&verification.location_remarks)
    .bind(&verification.category_remarks)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the score document for a report
pub async fn insert_score(
    pool: &SqlitePool,
    report_id: Uuid,
    uid: &str,
    score: &ScoreResult,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scores (
            report_id, uid, image_score, description_score, category_score,
            geo_score, bonus, total_score, remarks, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report_id.to_string())
    .bind(uid)
    .bind(score.image_score)
    .bind(score.description_score)
    .bind(score.category_score)
    .bind(score.geo_score)
    .bind(score.bonus)
    .bind(score.total_score)
    .bind(&score.remarks)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Number of stored reports for a submitter
pub async fn count_reports_for_uid(pool: &SqlitePool, uid: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE uid = ?")
        .bind(uid)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
