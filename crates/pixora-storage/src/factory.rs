use crate::{AssetStore, HttpAssetStore, LocalAssetStore, StorageBackend, StorageError, StorageResult};
use pixora_core::EditorConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create an asset store based on configuration
pub async fn create_store(config: &EditorConfig) -> StorageResult<Arc<dyn AssetStore>> {
    match config.storage_backend {
        StorageBackend::Http => {
            let upload_url = config.upload_url.clone().ok_or_else(|| {
                StorageError::ConfigError("PIXORA_UPLOAD_URL not configured".to_string())
            })?;

            let mut store = HttpAssetStore::new(
                upload_url,
                config.upload_private_key.clone(),
                Duration::from_secs(config.http_timeout_secs),
            )?;
            if let Some(base_url) = &config.asset_base_url {
                store = store.with_asset_base_url(base_url.clone());
            }

            tracing::debug!(backend = "http", "Asset store initialized");
            Ok(Arc::new(store))
        }

        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("PIXORA_LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError(
                    "PIXORA_LOCAL_STORAGE_BASE_URL not configured".to_string(),
                )
            })?;

            let store = LocalAssetStore::new(base_path, base_url).await?;
            tracing::debug!(backend = "local", "Asset store initialized");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_local_store() {
        let dir = TempDir::new().unwrap();
        let config = EditorConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(dir.path().display().to_string()),
            local_storage_base_url: Some("http://localhost:3000/assets".to_string()),
            ..EditorConfig::default()
        };

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "local");
    }

    #[tokio::test]
    async fn test_create_http_store_requires_upload_url() {
        let config = EditorConfig {
            storage_backend: StorageBackend::Http,
            upload_url: None,
            ..EditorConfig::default()
        };

        let result = create_store(&config).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
