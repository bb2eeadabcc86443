//! Remote asset store backed by an image CDN.
//!
//! Fetches go straight to the reference URL; the CDN renders whatever chain
//! the `tr` parameter carries. Uploads are posted as multipart forms to the
//! configured upload endpoint.

use async_trait::async_trait;
use pixora_core::{AssetReference, UploadedAsset};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::decode::decode_image;
use crate::keys::sanitize_filename;
use crate::traits::{AssetStore, FetchedImage, StorageError, StorageResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

fn default_success() -> bool {
    true
}

/// HTTP asset store
#[derive(Clone)]
pub struct HttpAssetStore {
    client: reqwest::Client,
    upload_url: String,
    private_key: Option<String>,
    asset_base_url: Option<String>,
}

impl HttpAssetStore {
    /// Create a new HttpAssetStore
    ///
    /// # Arguments
    /// * `upload_url` - Endpoint accepting multipart uploads
    /// * `private_key` - Sent as the basic-auth user when present
    /// * `timeout` - Per-request timeout
    pub fn new(
        upload_url: impl Into<String>,
        private_key: Option<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpAssetStore {
            client,
            upload_url: upload_url.into(),
            private_key,
            asset_base_url: None,
        })
    }

    /// Resolve relative references against this base URL
    pub fn with_asset_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.asset_base_url = Some(base_url.into());
        self
    }

    fn resolve_url(&self, reference: &AssetReference) -> String {
        let raw = reference.as_str();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }
        match &self.asset_base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                raw.trim_start_matches('/')
            ),
            None => raw.to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadedAsset> {
        let start = Instant::now();
        let size = data.len();
        let name = sanitize_filename(filename);

        let part = Part::bytes(data)
            .file_name(name.clone())
            .mime_str(content_type)
            .map_err(|e| StorageError::UploadFailed(format!("Invalid content type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("fileName", name.clone());

        let mut request = self.client.post(&self.upload_url).multipart(form);
        if let Some(key) = &self.private_key {
            request = request.basic_auth(key, Some(""));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid upload response: {}", e)))?;

        let url = match uploaded.url {
            Some(url) if uploaded.success => url,
            _ => {
                return Err(StorageError::UploadFailed(
                    uploaded
                        .error
                        .unwrap_or_else(|| "Failed to upload image".to_string()),
                ))
            }
        };

        tracing::info!(
            filename = %name,
            url = %url,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "Uploaded asset"
        );

        Ok(UploadedAsset {
            reference: AssetReference::new(url),
            width: uploaded.width,
            height: uploaded.height,
            thumbnail_reference: uploaded.thumbnail_url.map(AssetReference::new),
        })
    }

    async fn fetch(&self, reference: &AssetReference) -> StorageResult<FetchedImage> {
        let start = Instant::now();
        let url = self.resolve_url(reference);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StorageError::FetchFailed(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(url));
        }
        if !status.is_success() {
            return Err(StorageError::FetchFailed(format!(
                "{}: HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::FetchFailed(format!("{}: {}", url, e)))?;

        let fetched = decode_image(reference, &body)?;

        tracing::debug!(
            url = %url,
            width = fetched.width,
            height = fetched.height,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "Fetched asset"
        );

        Ok(fetched)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([9, 9, 9, 255])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn store(server: &mockito::ServerGuard) -> HttpAssetStore {
        HttpAssetStore::new(
            format!("{}/upload", server.url()),
            Some("private_key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_transformed_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/demo/img.png")
            .match_query(mockito::Matcher::UrlEncoded(
                "tr".into(),
                "bg-genfill,w-1000,h-600,cm-pad_resize,fo-right".into(),
            ))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png_bytes(20, 12))
            .create_async()
            .await;

        let reference = AssetReference::new(format!(
            "{}/demo/img.png?tr=bg-genfill,w-1000,h-600,cm-pad_resize,fo-right",
            server.url()
        ));
        let fetched = store(&server).fetch(&reference).await.unwrap();

        assert_eq!((fetched.width, fetched.height), (20, 12));
        assert_eq!(fetched.reference, reference);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_resolves_relative_reference() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/demo/img.png")
            .with_status(200)
            .with_body(png_bytes(3, 3))
            .create_async()
            .await;

        let store = store(&server).with_asset_base_url(format!("{}/", server.url()));
        let fetched = store.fetch(&AssetReference::new("/demo/img.png")).await.unwrap();

        assert_eq!(fetched.width, 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/broken.png")
            .with_status(502)
            .create_async()
            .await;

        let store = store(&server);
        let missing = store
            .fetch(&AssetReference::new(format!("{}/missing.png", server.url())))
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));

        let broken = store
            .fetch(&AssetReference::new(format!("{}/broken.png", server.url())))
            .await;
        assert!(matches!(broken, Err(StorageError::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_upload_returns_reference_and_dimensions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("authorization", mockito::Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"url":"https://ik.example.com/demo/beach.png","width":1200,"height":800,"thumbnailUrl":"https://ik.example.com/demo/tr:n-thumb/beach.png"}"#,
            )
            .create_async()
            .await;

        let uploaded = store(&server)
            .upload("beach.png", "image/png", png_bytes(4, 4))
            .await
            .unwrap();

        assert_eq!(uploaded.reference.as_str(), "https://ik.example.com/demo/beach.png");
        assert_eq!(uploaded.width, Some(1200));
        assert_eq!(uploaded.height, Some(800));
        assert!(uploaded.thumbnail_reference.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_unsuccessful_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"error":"Quota exceeded"}"#)
            .create_async()
            .await;

        let result = store(&server)
            .upload("beach.png", "image/png", png_bytes(4, 4))
            .await;

        match result {
            Err(StorageError::UploadFailed(message)) => assert_eq!(message, "Quota exceeded"),
            other => panic!("expected upload failure, got {:?}", other.map(|a| a.reference)),
        }
    }

    #[tokio::test]
    async fn test_upload_failure_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let result = store(&server)
            .upload("beach.png", "image/png", png_bytes(4, 4))
            .await;

        match result {
            Err(StorageError::UploadFailed(message)) => assert!(message.contains("HTTP 500")),
            other => panic!("expected upload failure, got {:?}", other.map(|a| a.reference)),
        }
    }
}
