//! Pixora Core Library
//!
//! Asset references, the transformation URL builder and parser, the error
//! taxonomy, configuration and the domain models shared by every Pixora crate.

pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod reference;
pub mod storage_types;
pub mod transform_url;

// Re-export commonly used types
pub use config::EditorConfig;
pub use error::{ErrorMetadata, LogLevel, PipelineError, PipelineResult, TransformError};
pub use models::{CreateProjectRequest, PixelSize, Project, ProjectUpdate, UploadedAsset};
pub use persistence::{NoOpProjectStore, ProjectStore};
pub use reference::AssetReference;
pub use storage_types::StorageBackend;
pub use transform_url::{
    resolve_focus, EdgeSet, FocusAnchor, ParsedChain, TransformOperation, TransformUrlBuilder,
    TransformUrlParser,
};
