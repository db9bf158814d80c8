//! Uploaded photo storage

use async_trait::async_trait;
use ecowatch_common::models::{content_type_for_extension, ImageUpload};
use ecowatch_common::{Error, Result};
use std::path::PathBuf;
use uuid::Uuid;

/// Route prefix under which stored images are served
pub const IMAGE_ROUTE_PREFIX: &str = "/images";

/// Image bytes read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object store for report photos
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the image under `key` and return its public URL
    async fn put(&self, key: &str, image: &ImageUpload) -> Result<String>;

    /// `None` for unknown or unsafe keys
    async fn get(&self, key: &str) -> Result<Option<StoredImage>>;
}

/// Storage key for a report's photo: `<report_id>.<ext>`
pub fn image_key(report_id: Uuid, image: &ImageUpload) -> String {
    format!("{}.{}", report_id, image.extension())
}

pub fn public_url(key: &str) -> String {
    format!("{}/{}", IMAGE_ROUTE_PREFIX, key)
}

/// A key is a single file name: `[A-Za-z0-9._-]`, no leading dot, no `..`
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && !key.contains("..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// [`ImageStore`] writing one file per image into a directory
#[derive(Debug, Clone)]
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(&self, key: &str, image: &ImageUpload) -> Result<String> {
        if !is_safe_key(key) {
            return Err(Error::InvalidInput(format!("Unsafe image key: {}", key)));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(key);
        tokio::fs::write(&path, &image.bytes).await?;

        tracing::debug!(path = %path.display(), bytes = image.bytes.len(), "Stored image");
        Ok(public_url(key))
    }

    async fn get(&self, key: &str) -> Result<Option<StoredImage>> {
        if !is_safe_key(key) {
            return Ok(None);
        }

        let path = self.dir.join(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                Ok(Some(StoredImage {
                    bytes,
                    content_type: content_type_for_extension(extension).to_string(),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
