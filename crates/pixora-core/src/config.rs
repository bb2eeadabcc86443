//! Configuration module
//!
//! Editor configuration is read from `PIXORA_*` environment variables, with a
//! `.env` file loaded first when present.

use std::env;

use crate::models::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use crate::storage_types::StorageBackend;

const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_UPLOAD_SIZE_MB: usize = 20;
const DEFAULT_EXTENSION_AMOUNT: u32 = 200;
const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Editor configuration
#[derive(Clone, Debug)]
pub struct EditorConfig {
    pub environment: String,
    // Asset store
    pub storage_backend: StorageBackend,
    pub asset_base_url: Option<String>,
    pub upload_url: Option<String>,
    pub upload_private_key: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Project persistence
    pub api_url: String,
    pub api_key: Option<String>,
    pub http_timeout_secs: u64,
    // Upload limits
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    // Editing defaults
    pub default_canvas_width: u32,
    pub default_canvas_height: u32,
    pub default_extension_amount: u32,
}

impl EditorConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("PIXORA_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("PIXORA_STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Http,
        };

        let max_upload_mb = env::var("PIXORA_MAX_UPLOAD_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let allowed_extensions = env::var("PIXORA_ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "png,jpg,jpeg,webp,gif".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(EditorConfig {
            environment,
            storage_backend,
            asset_base_url: env::var("PIXORA_ASSET_BASE_URL").ok(),
            upload_url: env::var("PIXORA_UPLOAD_URL").ok(),
            upload_private_key: env::var("PIXORA_UPLOAD_PRIVATE_KEY").ok(),
            local_storage_path: env::var("PIXORA_LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("PIXORA_LOCAL_STORAGE_BASE_URL").ok(),
            api_url: env::var("PIXORA_API_URL")
                .or_else(|_| env::var("API_URL"))
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: env::var("PIXORA_API_KEY").ok(),
            http_timeout_secs: env::var("PIXORA_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            allowed_extensions,
            default_canvas_width: env::var("PIXORA_DEFAULT_CANVAS_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CANVAS_WIDTH),
            default_canvas_height: env::var("PIXORA_DEFAULT_CANVAS_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CANVAS_HEIGHT),
            default_extension_amount: env::var("PIXORA_DEFAULT_EXTENSION_AMOUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EXTENSION_AMOUNT),
        })
    }

    /// Check if the editor is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.default_canvas_width == 0 || self.default_canvas_height == 0 {
            return Err(anyhow::anyhow!(
                "PIXORA_DEFAULT_CANVAS_WIDTH and PIXORA_DEFAULT_CANVAS_HEIGHT must be greater than 0"
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "PIXORA_HTTP_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("PIXORA_MAX_UPLOAD_MB must be greater than 0"));
        }

        match self.storage_backend {
            StorageBackend::Http => {
                if self.upload_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "PIXORA_UPLOAD_URL must be set when using the http storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "PIXORA_LOCAL_STORAGE_PATH must be set when using the local storage backend"
                    ));
                }
            }
        }

        if self.is_production() && self.api_key.is_none() {
            return Err(anyhow::anyhow!("PIXORA_API_KEY must be set in production"));
        }

        Ok(())
    }

    /// Whether `filename` has an extension accepted for new projects
    pub fn accepts_extension(&self, filename: &str) -> bool {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .map(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
            .unwrap_or(false)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            environment: "development".to_string(),
            storage_backend: StorageBackend::Http,
            asset_base_url: None,
            upload_url: None,
            upload_private_key: None,
            local_storage_path: None,
            local_storage_base_url: None,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            max_upload_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            allowed_extensions: ["png", "jpg", "jpeg", "webp", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_canvas_width: DEFAULT_CANVAS_WIDTH,
            default_canvas_height: DEFAULT_CANVAS_HEIGHT,
            default_extension_amount: DEFAULT_EXTENSION_AMOUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = EditorConfig::default();
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.default_canvas_width, 800);
        assert_eq!(config.default_canvas_height, 600);
        assert_eq!(config.default_extension_amount, 200);
    }

    #[test]
    fn test_accepts_extension() {
        let config = EditorConfig::default();
        assert!(config.accepts_extension("holiday.JPG"));
        assert!(config.accepts_extension("scan.webp"));
        assert!(!config.accepts_extension("notes.txt"));
        assert!(!config.accepts_extension("no_extension"));
    }

    #[test]
    fn test_validate_requires_backend_settings() {
        let mut config = EditorConfig::default();
        assert!(config.validate().is_err());

        config.upload_url = Some("https://upload.example.com".to_string());
        assert!(config.validate().is_ok());

        config.storage_backend = StorageBackend::Local;
        assert!(config.validate().is_err());
        config.local_storage_path = Some("/tmp/pixora".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = EditorConfig {
            upload_url: Some("https://upload.example.com".to_string()),
            http_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("HTTP".parse::<StorageBackend>().unwrap(), StorageBackend::Http);
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("s3".parse::<StorageBackend>().is_err());
    }
}
