//! Shared fixtures for ecowatch-api integration tests
//!
//! Builds the real router over an in-memory database and a temporary image
//! folder, with a scripted model standing in for Gemini.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use ecowatch_api::ai::{AiError, GenerationRequest, GenerativeModel};
use ecowatch_api::analysis::ReportAnalyzer;
use ecowatch_api::store::{FsImageStore, ImageStore, ReportStore, SqliteReportStore};
use ecowatch_api::{build_router, AppState};
use ecowatch_common::models::{Report, ScoreResult, VerificationResult};
use ecowatch_common::{Error, Result};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "ecowatch-test-boundary";

/// Minimal JFIF header; enough for content sniffing
pub const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
];

pub const VERIFIED_RESPONSE: &str = r#"```json
{
 "location_verification": "Location Verified",
 "location_confidence": "92%",
 "image_category_verification": "Consistent",
 "category_confidence": "81%",
 "location_remarks": "Coordinates fall in the Vembanad estuary mangrove belt",
 "category_remarks": "Freshly cut stumps are visible"
}
```"#;

pub const HIGH_SCORE_RESPONSE: &str = r#"{"image_score": 45, "description_score": 16,
 "category_score": 9, "geo_score": 9, "bonus": 5, "total_score": 84,
 "remarks": "Clear evidence of cutting"}"#;

pub const PENALTY_SCORE_RESPONSE: &str = r#"```json
{"image_score": 0, "description_score": 2, "category_score": 0,
 "geo_score": 3, "bonus": -10, "total_score": -5, "remarks": "Likely spam"}
```"#;

// ============================================================================
// Scripted model
// ============================================================================

/// Returns queued responses in order and records every request
pub struct ScriptedModel {
    responses: Mutex<Vec<std::result::Result<String, AiError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<std::result::Result<String, AiError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> std::result::Result<String, AiError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(AiError::EmptyResponse))
    }
}

// ============================================================================
// Failing store
// ============================================================================

/// Report store whose writes all fail
pub struct UnavailableReportStore;

fn unavailable<T>() -> Result<T> {
    Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "database unavailable",
    )))
}

#[async_trait]
impl ReportStore for UnavailableReportStore {
    async fn create_report(&self, _id: Uuid, _report: &Report, _image_url: &str) -> Result<()> {
        unavailable()
    }

    async fn create_verification(
        &self,
        _report_id: Uuid,
        _verification: &VerificationResult,
    ) -> Result<()> {
        unavailable()
    }

    async fn create_score(&self, _report_id: Uuid, _uid: &str, _score: &ScoreResult) -> Result<()> {
        unavailable()
    }

    async fn add_points(&self, _uid: &str, _delta: i64) -> Result<i64> {
        unavailable()
    }

    async fn points(&self, _uid: &str) -> Result<Option<i64>> {
        Ok(None)
    }
}

// ============================================================================
// App
// ============================================================================

/// Router plus handles for inspecting what it did
pub struct TestApp {
    pub router: Router,
    pub model: Arc<ScriptedModel>,
    pub store: Arc<SqliteReportStore>,
    pub images: Arc<FsImageStore>,
    /// Keeps the image folder alive for the test's duration
    pub images_dir: TempDir,
}

impl TestApp {
    pub async fn new(model: Arc<ScriptedModel>) -> Self {
        Self::with_limit(model, None).await
    }

    pub async fn with_limit(model: Arc<ScriptedModel>, max_upload_bytes: Option<usize>) -> Self {
        let pool = ecowatch_api::db::init_memory_pool().await.unwrap();
        let store = Arc::new(SqliteReportStore::new(pool));
        let images_dir = TempDir::new().unwrap();
        let images = Arc::new(FsImageStore::new(images_dir.path().join("images")));

        let mut state = AppState::new(
            Arc::new(ReportAnalyzer::new(model.clone())),
            store.clone(),
            images.clone(),
        );
        if let Some(limit) = max_upload_bytes {
            state = state.with_upload_limit(limit);
        }

        Self {
            router: build_router(state),
            model,
            store,
            images,
            images_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Router whose report store rejects every write
pub async fn app_with_unavailable_store(model: Arc<ScriptedModel>) -> (Router, TempDir) {
    let images_dir = TempDir::new().unwrap();
    let images: Arc<dyn ImageStore> = Arc::new(FsImageStore::new(images_dir.path()));
    let state = AppState::new(
        Arc::new(ReportAnalyzer::new(model)),
        Arc::new(UnavailableReportStore),
        images,
    );
    (build_router(state), images_dir)
}

// ============================================================================
// Requests
// ============================================================================

/// One multipart part
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: Option<&'a str>,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                if let Some(ct) = content_type {
                    body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// The fields of a complete report, in form order
pub fn report_parts<'a>(uid: &'a str, image: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::Text("description", "Tree stumps visible near shoreline"),
        Part::Text("category", "Illegal Cutting"),
        Part::Text("latitude", "9.96"),
        Part::Text("longitude", "76.24"),
        Part::Text("uid", uid),
        Part::File {
            name: "image",
            file_name: "site.jpg",
            content_type: Some("image/jpeg"),
            bytes: image,
        },
    ]
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
