//! Project endpoints
//!
//! `ProjectClient` maps the `ProjectStore` operations onto the project
//! service's REST routes. Transport failures carry `anyhow` context and are
//! surfaced as `PipelineError::Persistence`.

use async_trait::async_trait;
use pixora_core::models::{CreateProjectRequest, Project, ProjectUpdate};
use pixora_core::{EditorConfig, PipelineError, PipelineResult, ProjectStore};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::{ApiClient, Auth};

const PROJECTS_PATH: &str = "/api/projects";

#[derive(Debug, Deserialize)]
struct CreateProjectResponse {
    id: Uuid,
}

/// Response of the project listing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

fn persistence_error(error: anyhow::Error) -> PipelineError {
    PipelineError::Persistence(format!("{:#}", error))
}

/// HTTP project store
#[derive(Clone, Debug)]
pub struct ProjectClient {
    api: ApiClient,
}

impl ProjectClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn from_config(config: &EditorConfig) -> anyhow::Result<Self> {
        Ok(Self::new(ApiClient::from_config(config)?))
    }

    pub fn with_auth(base_url: &str, auth: Auth, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self::new(ApiClient::new(base_url, auth, timeout)?))
    }

    fn project_path(project_id: Uuid) -> String {
        format!("{}/{}", PROJECTS_PATH, project_id)
    }

    /// Projects owned by the caller, most recently updated first
    pub async fn list_projects(&self) -> PipelineResult<Vec<Project>> {
        let mut response: ProjectListResponse =
            self.api.get(PROJECTS_PATH).await.map_err(persistence_error)?;
        response
            .projects
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(response.projects)
    }

    pub async fn delete_project(&self, project_id: Uuid) -> PipelineResult<()> {
        self.api
            .delete(&Self::project_path(project_id))
            .await
            .map_err(persistence_error)?;
        tracing::info!(project_id = %project_id, "Project deleted");
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for ProjectClient {
    async fn get_project(&self, project_id: Uuid) -> PipelineResult<Project> {
        self.api
            .get(&Self::project_path(project_id))
            .await
            .map_err(|e| {
                tracing::warn!(project_id = %project_id, error = %e, "Failed to load project");
                persistence_error(e)
            })
    }

    async fn create_project(&self, request: CreateProjectRequest) -> PipelineResult<Uuid> {
        let response: CreateProjectResponse = self
            .api
            .post_json(PROJECTS_PATH, &request)
            .await
            .map_err(|e| {
                tracing::warn!(title = %request.title, error = %e, "Failed to create project");
                persistence_error(e)
            })?;
        Ok(response.id)
    }

    async fn update_project(&self, project_id: Uuid, update: ProjectUpdate) -> PipelineResult<()> {
        if update.is_empty() {
            tracing::debug!(project_id = %project_id, "Skipping empty project update");
            return Ok(());
        }

        let start = Instant::now();
        self.api
            .patch_json(&Self::project_path(project_id), &update)
            .await
            .map_err(persistence_error)?;

        tracing::debug!(
            project_id = %project_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Project updated"
        );
        Ok(())
    }
}
