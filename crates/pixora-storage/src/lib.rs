//! Pixora Storage Library
//!
//! This crate provides the asset store collaborator: the `AssetStore` trait
//! and implementations backed by a remote image CDN (HTTP), the local
//! filesystem and memory.
//!
//! # Reference format
//!
//! Every backend hands out references that can be fed back into `fetch`.
//! Uploaded originals are stored under `uploads/{uuid}-{filename}`; key
//! generation is centralized in the `keys` module so all backends agree.

pub(crate) mod decode;
pub mod factory;
pub mod http;
pub(crate) mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
pub use http::HttpAssetStore;
pub use local::LocalAssetStore;
pub use memory::MemoryAssetStore;
pub use pixora_core::StorageBackend;
pub use traits::{AssetStore, FetchedImage, StorageError, StorageResult};
