use async_trait::async_trait;
use pixora_core::{AssetReference, UploadedAsset};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::decode::{decode_image, probe_dimensions};
use crate::keys::generate_upload_key;
use crate::traits::{AssetStore, FetchedImage, StorageError, StorageResult};

/// Local filesystem asset store
///
/// Serves originals only: it has no renderer, so references carrying a
/// transformation chain are rejected with `StorageError::Unsupported`.
#[derive(Clone)]
pub struct LocalAssetStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    /// Create a new LocalAssetStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/pixora/assets")
    /// * `base_url` - Base URL references are issued under (e.g., "http://localhost:3000/assets")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalAssetStore {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path, rejecting keys that escape
    /// the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Storage key behind a reference issued by this store
    fn reference_to_key<'a>(&self, reference: &'a AssetReference) -> StorageResult<&'a str> {
        if reference.is_transformed() {
            return Err(StorageError::Unsupported(reference.to_string()));
        }

        let prefix = format!("{}/", self.base_url.trim_end_matches('/'));
        reference
            .base_path()
            .strip_prefix(&prefix)
            .ok_or_else(|| {
                StorageError::InvalidKey(format!(
                    "{} was not issued by this store",
                    reference.base_path()
                ))
            })
    }

    fn generate_reference(&self, key: &str) -> AssetReference {
        AssetReference::new(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadedAsset> {
        let start = Instant::now();
        let storage_key = generate_upload_key(filename);
        let path = self.key_to_path(&storage_key)?;

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.flush().await?;

        let dimensions = probe_dimensions(&data);

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_millis(),
            "Stored asset on local filesystem"
        );

        Ok(UploadedAsset {
            reference: self.generate_reference(&storage_key),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            thumbnail_reference: None,
        })
    }

    async fn fetch(&self, reference: &AssetReference) -> StorageResult<FetchedImage> {
        let key = self.reference_to_key(reference)?;
        let path = self.key_to_path(key)?;

        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::FetchFailed(format!("Failed to read {}: {}", path.display(), e))
            }
        })?;

        tracing::debug!(path = %path.display(), size_bytes = data.len(), "Read asset from local filesystem");

        decode_image(reference, &data)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    const BASE_URL: &str = "http://localhost:3000/assets";

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        let uploaded = store
            .upload("beach photo.png", "image/png", png_bytes(16, 9))
            .await
            .unwrap();

        assert!(uploaded.reference.as_str().starts_with(BASE_URL));
        assert!(uploaded.reference.as_str().ends_with("-beach_photo.png"));
        assert_eq!(uploaded.width, Some(16));
        assert_eq!(uploaded.height, Some(9));

        let fetched = store.fetch(&uploaded.reference).await.unwrap();
        assert_eq!((fetched.width, fetched.height), (16, 9));
    }

    #[tokio::test]
    async fn test_fetch_rejects_transformed_reference() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();
        let uploaded = store
            .upload("img.png", "image/png", png_bytes(2, 2))
            .await
            .unwrap();

        let transformed = uploaded.reference.with_chain("e-bgremove");
        let result = store.fetch(&transformed).await;
        assert!(matches!(result, Err(StorageError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_traversal_and_foreign_references() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        let traversal = AssetReference::new(format!("{}/../secret.png", BASE_URL));
        assert!(matches!(
            store.fetch(&traversal).await,
            Err(StorageError::InvalidKey(_))
        ));

        let foreign = AssetReference::new("https://elsewhere.example.com/img.png");
        assert!(matches!(
            store.fetch(&foreign).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalAssetStore::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap();

        let missing = AssetReference::new(format!("{}/uploads/nope.png", BASE_URL));
        assert!(matches!(
            store.fetch(&missing).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
