//! POST /upload, the report submission endpoint
//!
//! Multipart fields: `description`, `category`, `latitude`, `longitude`,
//! `uid` (text) and `image` (file). Validation is a presence check plus float
//! parsing of the coordinates; everything else is left to the model.

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, State,
    },
    routing::post,
    Json, Router,
};
use ecowatch_common::models::{ImageUpload, Report};
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    pipeline::{ReportPipeline, UploadResponse},
    AppState,
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Raw multipart fields before the presence check
#[derive(Debug, Default)]
pub struct UploadForm {
    pub description: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub uid: Option<String>,
    pub image: Option<ImageUpload>,
}

impl UploadForm {
    /// Drain the multipart stream, keeping the known fields
    ///
    /// Blank text fields and empty files count as absent. A repeated field
    /// keeps its last value.
    pub async fn read(multipart: &mut Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "image" => {
                    let declared = field.content_type().map(str::to_string);
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await?;
                    form.image = (!bytes.is_empty()).then(|| ImageUpload {
                        content_type: resolve_content_type(declared.as_deref(), &bytes),
                        bytes: bytes.to_vec(),
                        file_name,
                    });
                }
                "description" | "category" | "latitude" | "longitude" | "uid" => {
                    let text = field.text().await?;
                    let value = non_blank(text);
                    match name.as_str() {
                        "description" => form.description = value,
                        "category" => form.category = value,
                        "latitude" => form.latitude = value,
                        "longitude" => form.longitude = value,
                        _ => form.uid = value,
                    }
                }
                _ => debug!(field = %name, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Names of required fields that were absent or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("description", self.description.is_none()),
            ("category", self.category.is_none()),
            ("latitude", self.latitude.is_none()),
            ("longitude", self.longitude.is_none()),
            ("uid", self.uid.is_none()),
            ("image", self.image.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    /// Presence check, then coordinate parsing
    pub fn into_report(self) -> ApiResult<Report> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Missing required form fields: {}",
                missing.join(", ")
            )));
        }

        let (
            Some(description),
            Some(category),
            Some(latitude),
            Some(longitude),
            Some(uid),
            Some(image),
        ) = (
            self.description,
            self.category,
            self.latitude,
            self.longitude,
            self.uid,
            self.image,
        )
        else {
            return Err(ApiError::BadRequest("Missing required form fields".to_string()));
        };

        Ok(Report {
            latitude: parse_coordinate("latitude", &latitude)?,
            longitude: parse_coordinate("longitude", &longitude)?,
            uid,
            category,
            description,
            image,
        })
    }
}

fn non_blank(text: String) -> Option<String> {
    (!text.trim().is_empty()).then_some(text)
}

/// Parse as a finite float; no range check
fn parse_coordinate(name: &str, raw: &str) -> ApiResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {}: {:?}", name, raw)))
}

/// Declared content type, or one sniffed from the bytes when it is missing
/// or generic
fn resolve_content_type(declared: Option<&str>, bytes: &[u8]) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case(OCTET_STREAM) => ct.to_string(),
        _ => infer::get(bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    }
}

/// POST /upload
pub async fn upload_report(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let report = UploadForm::read(&mut multipart).await?.into_report()?;

    info!(
        uid = %report.uid,
        category = %report.category,
        latitude = report.latitude,
        longitude = report.longitude,
        image_bytes = report.image.bytes.len(),
        content_type = %report.image.content_type,
        file_name = report.image.file_name.as_deref().unwrap_or("-"),
        "Report upload received"
    );

    let pipeline = ReportPipeline::new(&state.analyzer, state.store.as_ref(), state.images.as_ref());
    let outcome = pipeline
        .run(report)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(outcome.into()))
}

/// Upload route with its body size limit
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_report))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
