//! Welcome endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

pub const WELCOME_MESSAGE: &str = "Welcome to the EcoWatch Analysis API!";

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
    /// Crate version from Cargo.toml
    pub version: &'static str,
    pub git_hash: &'static str,
    /// Seconds since service started
    pub uptime_seconds: u64,
}

/// GET /
pub async fn welcome(State(state): State<AppState>) -> Json<WelcomeResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(WelcomeResponse {
        message: WELCOME_MESSAGE,
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(welcome))
}
