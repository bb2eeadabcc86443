//! Pixora Editor Library
//!
//! The transform pipeline: a scene holding one editable image, an adapter
//! that swaps it for freshly transformed renditions, a serializer for the
//! persisted canvas state and the tool controllers that drive it all.
//!
//! # Example
//!
//! ```no_run
//! use image::DynamicImage;
//! use pixora_core::EdgeSet;
//! use pixora_editor::test_helpers::{sample_project, RecordingProjectStore};
//! use pixora_editor::EditorSession;
//! use pixora_storage::MemoryAssetStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let original = "https://ik.example.com/demo/img.png";
//! let store = Arc::new(MemoryAssetStore::new());
//! store.insert_image(original, &DynamicImage::new_rgba8(800, 600))?;
//! store.insert_image(
//!     format!("{}?tr=bg-genfill,w-1000,h-600,cm-pad_resize,fo-right", original),
//!     &DynamicImage::new_rgba8(1000, 600),
//! )?;
//!
//! let project = sample_project(original, 800, 600);
//! let projects = Arc::new(RecordingProjectStore::new());
//! projects.insert(project.clone());
//!
//! let mut session = EditorSession::open(project, store, projects);
//! session.load().await?;
//! session.tools_mut().extend.set_directions(EdgeSet::LEFT);
//! let outcome = session.apply_extend().await?;
//! println!("{}", outcome.reference);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod export;
pub mod gate;
pub mod scene;
pub mod serializer;
pub mod session;
pub mod test_helpers;
pub mod tools;

// Re-export commonly used types
pub use adapter::{
    effective_geometry, fit_to_canvas_scale, has_background_removal, locate_main_image, replace,
    stage, DisplayedSize, StagedImage,
};
pub use export::{ExportEncoding, ExportFormat, ExportedImage};
pub use gate::{ProcessingGate, ProcessingGuard};
pub use scene::{CropWindow, EditableImage, ObjectId, Placement, Scene, SceneObject, TextObject, Viewport};
pub use serializer::{deserialize, rehydrate, serialize, CanvasSnapshot};
pub use session::{create_project, EditorSession, NewProjectUpload, ToolSet};
pub use tools::{
    AiEffect, ApplyOutcome, BackgroundMode, BackgroundTool, CropTool, EffectTool, ExtendTool,
    ExtensionStrategy, Notification, NotificationLevel, Tool, ToolState,
};
