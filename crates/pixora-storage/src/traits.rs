use async_trait::async_trait;
use image::DynamicImage;
use pixora_core::{AssetReference, PipelineError, PixelSize, UploadedAsset};
use std::sync::Arc;
use thiserror::Error;

/// Asset store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// The backend cannot render the requested transformation chain
    #[error("Transformations not supported by this backend: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for asset store operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Map into the pipeline error raised when a fetch fails
    pub fn into_fetch_error(self) -> PipelineError {
        PipelineError::AssetFetch(self.to_string())
    }

    /// Map into the pipeline error raised when an upload fails
    pub fn into_upload_error(self) -> PipelineError {
        PipelineError::Upload(self.to_string())
    }
}

/// A decoded image together with the reference it was loaded from
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub reference: AssetReference,
    pub image: Arc<DynamicImage>,
    pub width: u32,
    pub height: u32,
}

impl FetchedImage {
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }
}

/// Asset store abstraction
///
/// Implementations fetch (possibly transformed) images by reference and
/// accept uploads of new originals. A fetch of a reference carrying a
/// transformation chain returns the rendered result.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload an original image
    ///
    /// # Arguments
    /// * `filename` - Original filename, used to derive the stored name
    /// * `content_type` - MIME type of the file
    /// * `data` - Encoded file contents
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadedAsset>;

    /// Fetch and decode the image behind `reference`
    async fn fetch(&self, reference: &AssetReference) -> StorageResult<FetchedImage>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_maps_to_pipeline_error() {
        let err = StorageError::NotFound("img.png".to_string());
        assert_eq!(
            err.into_fetch_error(),
            PipelineError::AssetFetch("Asset not found: img.png".to_string())
        );

        let err = StorageError::UploadFailed("HTTP 500".to_string());
        assert_eq!(
            err.into_upload_error(),
            PipelineError::Upload("Upload failed: HTTP 500".to_string())
        );
    }
}
