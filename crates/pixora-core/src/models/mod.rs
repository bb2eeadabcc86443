//! Domain models shared by the editor, the asset store and the persistence client

pub mod asset;
pub mod project;

pub use asset::{PixelSize, UploadedAsset};
pub use project::{
    CreateProjectRequest, Project, ProjectUpdate, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH,
};
