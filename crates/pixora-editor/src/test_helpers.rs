//! In-memory collaborators for tests and offline runs

use async_trait::async_trait;
use chrono::Utc;
use pixora_core::{
    AssetReference, CreateProjectRequest, PipelineError, PipelineResult, Project, ProjectStore,
    ProjectUpdate,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Records {
    projects: HashMap<Uuid, Project>,
    updates: Vec<(Uuid, ProjectUpdate)>,
}

/// Project store that keeps projects in memory and records every update
#[derive(Default)]
pub struct RecordingProjectStore {
    records: Mutex<Records>,
    fail_updates: AtomicBool,
}

impl RecordingProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, project: Project) {
        self.records().projects.insert(project.id, project);
    }

    pub fn project(&self, id: Uuid) -> Option<Project> {
        self.records().projects.get(&id).cloned()
    }

    /// Updates received so far, in call order
    pub fn updates(&self) -> Vec<(Uuid, ProjectUpdate)> {
        self.records().updates.clone()
    }

    pub fn last_update(&self) -> Option<ProjectUpdate> {
        self.records().updates.last().map(|(_, update)| update.clone())
    }

    /// Make subsequent `update_project` calls fail
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProjectStore for RecordingProjectStore {
    async fn get_project(&self, project_id: Uuid) -> PipelineResult<Project> {
        self.project(project_id)
            .ok_or_else(|| PipelineError::Persistence(format!("Project {} not found", project_id)))
    }

    async fn create_project(&self, request: CreateProjectRequest) -> PipelineResult<Uuid> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: request.title,
            original_image_url: request.original_image_url,
            current_image_url: request.current_image_url,
            thumbnail_url: request.thumbnail_url,
            width: request.width,
            height: request.height,
            canvas_state: request.canvas_state,
            active_transformations: None,
            background_removed: false,
            created_at: now,
            updated_at: now,
        };
        let id = project.id;
        self.insert(project);
        Ok(id)
    }

    async fn update_project(&self, project_id: Uuid, update: ProjectUpdate) -> PipelineResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PipelineError::Persistence("injected update failure".to_string()));
        }

        let mut records = self.records();
        let project = records
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| PipelineError::Persistence(format!("Project {} not found", project_id)))?;
        update.apply_to(project);
        records.updates.push((project_id, update));
        Ok(())
    }
}

/// Untransformed project at `reference` with the given canvas size
pub fn sample_project(reference: &str, width: u32, height: u32) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        title: "Sample".to_string(),
        original_image_url: AssetReference::new(reference),
        current_image_url: AssetReference::new(reference),
        thumbnail_url: None,
        width,
        height,
        canvas_state: None,
        active_transformations: None,
        background_removed: false,
        created_at: now,
        updated_at: now,
    }
}
