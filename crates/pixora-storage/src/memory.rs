//! In-memory asset store.
//!
//! Holds pre-rendered fixtures keyed by the full reference string, so a
//! transformed reference resolves only if a fixture was registered for that
//! exact chain. Used by tests and offline demos.

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use pixora_core::{AssetReference, UploadedAsset};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

use crate::decode::{decode_image, probe_dimensions};
use crate::keys::generate_upload_key;
use crate::traits::{AssetStore, FetchedImage, StorageError, StorageResult};

pub const MEMORY_BASE_URL: &str = "memory://assets";

#[derive(Default)]
struct MemoryState {
    assets: HashMap<String, Bytes>,
    failing: HashSet<String>,
    fetched: Vec<AssetReference>,
}

#[derive(Default)]
pub struct MemoryAssetStore {
    state: Mutex<MemoryState>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register encoded bytes under `reference`
    pub fn insert(&self, reference: impl Into<AssetReference>, data: impl Into<Bytes>) {
        let reference = reference.into();
        self.state()
            .assets
            .insert(reference.into_string(), data.into());
    }

    /// Register an image under `reference`, encoded as PNG
    pub fn insert_image(
        &self,
        reference: impl Into<AssetReference>,
        image: &DynamicImage,
    ) -> StorageResult<()> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode fixture: {}", e)))?;
        self.insert(reference, buffer);
        Ok(())
    }

    /// Make every fetch of `reference` fail
    pub fn fail_on(&self, reference: impl Into<AssetReference>) {
        self.state().failing.insert(reference.into().into_string());
    }

    /// References fetched so far, in call order
    pub fn fetched_references(&self) -> Vec<AssetReference> {
        self.state().fetched.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state().fetched.len()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadedAsset> {
        let reference =
            AssetReference::new(format!("{}/{}", MEMORY_BASE_URL, generate_upload_key(filename)));
        let dimensions = probe_dimensions(&data);

        self.insert(reference.clone(), data);

        Ok(UploadedAsset {
            reference,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            thumbnail_reference: None,
        })
    }

    async fn fetch(&self, reference: &AssetReference) -> StorageResult<FetchedImage> {
        let data = {
            let mut state = self.state();
            state.fetched.push(reference.clone());

            if state.failing.contains(reference.as_str()) {
                return Err(StorageError::FetchFailed(format!(
                    "{}: injected failure",
                    reference
                )));
            }

            state
                .assets
                .get(reference.as_str())
                .cloned()
                .ok_or_else(|| StorageError::NotFound(reference.to_string()))?
        };

        decode_image(reference, &data)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
