//! Per-submitter running points total

use chrono::Utc;
use ecowatch_common::Result;
use sqlx::SqlitePool;

/// Atomically add `delta` (which may be negative) to a submitter's points
///
/// Creates the submitter at zero first if absent. Returns the new total.
pub async fn add_points(pool: &SqlitePool, uid: &str, delta: i64) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (uid, points, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(uid) DO UPDATE SET
            points = users.points + excluded.points,
            updated_at = excluded.updated_at
        RETURNING points
        "#,
    )
    .bind(uid)
    .bind(delta)
    .bind(Utc::now().to_rfc3339())
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Current points total, `None` for an unknown submitter
pub async fn get_points(pool: &SqlitePool, uid: &str) -> Result<Option<i64>> {
    let points = sqlx::query_scalar("SELECT points FROM users WHERE uid = ?")
        .bind(uid)
        .fetch_optional(pool)
        .await?;
    Ok(points)
}
