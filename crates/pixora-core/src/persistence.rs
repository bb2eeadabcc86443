//! Project persistence collaborator
//!
//! The editor never talks to a storage engine directly. It goes through this
//! trait, sending full replacement values for the fields it owns; there is no
//! read-modify-write contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PipelineResult;
use crate::models::{CreateProjectRequest, Project, ProjectUpdate};

/// Trait implemented by project persistence backends
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project by id
    async fn get_project(&self, project_id: Uuid) -> PipelineResult<Project>;

    /// Create a project and return its id
    async fn create_project(&self, request: CreateProjectRequest) -> PipelineResult<Uuid>;

    /// Replace the given fields of a project
    async fn update_project(&self, project_id: Uuid, update: ProjectUpdate) -> PipelineResult<()>;
}

/// No-op implementation for sessions that are never persisted
pub struct NoOpProjectStore;

#[async_trait]
impl ProjectStore for NoOpProjectStore {
    async fn get_project(&self, project_id: Uuid) -> PipelineResult<Project> {
        Err(crate::error::PipelineError::Persistence(format!(
            "Project {} not found",
            project_id
        )))
    }

    async fn create_project(&self, _request: CreateProjectRequest) -> PipelineResult<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn update_project(&self, _project_id: Uuid, _update: ProjectUpdate) -> PipelineResult<()> {
        Ok(())
    }
}
