//! GET /images/:key, serving stored report photos

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{error::{ApiError, ApiResult}, AppState};

pub async fn get_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let image = state
        .images
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Image not found: {}", key)))?;

    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes))
}

pub fn image_routes() -> Router<AppState> {
    Router::new().route("/images/:key", get(get_image))
}
