//! ecowatch-api library interface
//!
//! Exposes the router and its state so integration tests can drive the
//! service with substitute models and stores.

pub mod ai;
pub mod analysis;
pub mod api;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use ecowatch_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::analysis::ReportAnalyzer;
use crate::store::{ImageStore, ReportStore};

/// Application state shared across handlers
///
/// Built once at startup; every handle is read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Verification and scoring against the generative model
    pub analyzer: Arc<ReportAnalyzer>,
    /// Report, verification, score and points documents
    pub store: Arc<dyn ReportStore>,
    /// Uploaded photos
    pub images: Arc<dyn ImageStore>,
    /// Body limit for `POST /upload`
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        analyzer: Arc<ReportAnalyzer>,
        store: Arc<dyn ReportStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            analyzer,
            store,
            images,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            startup_time: Utc::now(),
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::root_routes())
        .merge(api::health_routes())
        .merge(api::upload_routes(upload_limit))
        .merge(api::image_routes())
        .merge(api::user_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
