//! GET /users/:uid/points, the submitter's running total

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{error::{ApiError, ApiResult}, AppState};

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub uid: String,
    pub points: i64,
}

pub async fn get_points(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<PointsResponse>> {
    let points = state
        .store
        .points(&uid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Unknown user: {}", uid)))?;

    Ok(Json(PointsResponse { uid, points }))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/:uid/points", get(get_points))
}
