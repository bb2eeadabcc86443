//! Editor session
//!
//! Owns one project's scene, its tools and the collaborators, and turns
//! every outcome into user notifications.

use chrono::Utc;
use pixora_core::{
    CreateProjectRequest, EditorConfig, PipelineError, PipelineResult, Project,
    ProjectStore, ProjectUpdate,
};
use pixora_storage::AssetStore;
use std::sync::Arc;

use crate::adapter::stage;
use crate::export::{self, ExportFormat, ExportedImage};
use crate::gate::ProcessingGate;
use crate::scene::{Scene, DEFAULT_BACKGROUND};
use crate::serializer::{self, CanvasSnapshot};
use crate::tools::{
    ApplyContext, ApplyOutcome, BackgroundTool, CropTool, EffectTool, ExtendTool, Notification,
    Tool,
};

pub const UNTITLED_PROJECT: &str = "Untitled Project";

/// The tools of one session
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    pub extend: ExtendTool,
    pub crop: CropTool,
    pub background: BackgroundTool,
    pub effect: EffectTool,
}

pub struct EditorSession {
    project: Project,
    scene: Scene,
    store: Arc<dyn AssetStore>,
    projects: Arc<dyn ProjectStore>,
    gate: ProcessingGate,
    tools: ToolSet,
    notifications: Vec<Notification>,
}

impl EditorSession {
    /// Empty session at the project's canvas size; call `load` next
    pub fn open(project: Project, store: Arc<dyn AssetStore>, projects: Arc<dyn ProjectStore>) -> Self {
        let scene = Scene::new(project.width, project.height);
        EditorSession {
            project,
            scene,
            store,
            projects,
            gate: ProcessingGate::new(),
            tools: ToolSet::default(),
            notifications: Vec::new(),
        }
    }

    /// Share a processing gate with other surfaces
    pub fn with_gate(mut self, gate: ProcessingGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_extension_amount(mut self, amount: u32) -> Self {
        self.tools.extend = ExtendTool::new(amount);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn gate(&self) -> &ProcessingGate {
        &self.gate
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolSet {
        &mut self.tools
    }

    /// Take all pending notifications
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Restore the saved canvas, or place the current image when none is saved.
    ///
    /// Every image is fetched before the session's scene is replaced, so a
    /// failed load keeps whatever canvas was already there.
    pub async fn load(&mut self) -> PipelineResult<()> {
        let result = self.load_inner().await;
        if let Err(e) = &result {
            self.notifications.push(Notification::from_error(e));
        }
        result
    }

    async fn load_inner(&mut self) -> PipelineResult<()> {
        if let Some(state) = &self.project.canvas_state {
            match CanvasSnapshot::from_json(state) {
                Ok(snapshot) => {
                    let mut scene = Scene::new(self.project.width, self.project.height);
                    serializer::deserialize(&snapshot, &mut scene);
                    let fetched = serializer::rehydrate(&mut scene, self.store.as_ref()).await?;
                    let main_id = crate::adapter::locate_main_image(&scene).map(|image| image.id);
                    scene.set_active(main_id);
                    self.scene = scene;
                    tracing::info!(
                        project_id = %self.project.id,
                        objects = self.scene.objects().len(),
                        fetched = fetched,
                        "Restored saved canvas"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        project_id = %self.project.id,
                        error = %e,
                        "Saved canvas is unreadable; placing the current image instead"
                    );
                }
            }
        }

        let staged = stage(self.store.as_ref(), &self.project.current_image_url).await?;
        self.scene.clear();
        staged.commit(&mut self.scene, None);
        tracing::info!(project_id = %self.project.id, "Placed current image on empty canvas");
        Ok(())
    }

    /// Persist the current canvas
    pub async fn save(&mut self) -> PipelineResult<()> {
        let result = self.save_inner().await;
        match &result {
            Ok(()) => self
                .notifications
                .push(Notification::success("Project saved successfully!")),
            Err(e) => self.notifications.push(Notification::from_error(e)),
        }
        result
    }

    async fn save_inner(&mut self) -> PipelineResult<()> {
        let _guard = self.gate.try_acquire("Saving project...")?;
        let canvas_state = serializer::serialize(&self.scene).to_json()?;
        let update = ProjectUpdate {
            canvas_state: Some(canvas_state),
            ..ProjectUpdate::default()
        };

        self.projects
            .update_project(self.project.id, update.clone())
            .await
            .map_err(|e| {
                tracing::warn!(project_id = %self.project.id, error = %e, "Failed to save project");
                e
            })?;

        update.apply_to(&mut self.project);
        tracing::info!(project_id = %self.project.id, "Project saved");
        Ok(())
    }

    /// Throw away every edit and start again from the uploaded original.
    ///
    /// The original is fetched before the scene is cleared, so a failed fetch
    /// leaves the canvas intact.
    pub async fn reset_to_original(&mut self) -> PipelineResult<ApplyOutcome> {
        let result = self.reset_inner().await;
        match &result {
            Ok(outcome) => {
                let notifications = outcome.notifications("Canvas reset to original image");
                self.notifications.extend(notifications);
            }
            Err(e) => self.notifications.push(Notification::from_error(e)),
        }
        result
    }

    async fn reset_inner(&mut self) -> PipelineResult<ApplyOutcome> {
        let _guard = self.gate.try_acquire("Resetting to original...")?;
        let original = self.project.original_image_url.clone();

        let staged = stage(self.store.as_ref(), &original).await?;
        self.scene.clear();
        self.scene.set_background(DEFAULT_BACKGROUND);
        let object_id = staged.commit(&mut self.scene, None);

        let update = ProjectUpdate {
            current_image_url: Some(original.clone()),
            canvas_state: Some(serializer::serialize(&self.scene).to_json()?),
            active_transformations: Some(None),
            background_removed: Some(false),
        };

        let save_error = self
            .projects
            .update_project(self.project.id, update.clone())
            .await
            .err();
        if let Some(e) = &save_error {
            tracing::warn!(project_id = %self.project.id, error = %e, "Reset applied but project save failed");
        }

        update.apply_to(&mut self.project);
        tracing::info!(project_id = %self.project.id, reference = %original, "Reset to original image");

        Ok(ApplyOutcome {
            reference: original,
            object_id,
            update,
            save_error,
        })
    }

    /// Render and encode the canvas
    pub fn export(&mut self, format: ExportFormat) -> PipelineResult<ExportedImage> {
        let result = self
            .gate
            .try_acquire(format!("Exporting {}...", format.name))
            .and_then(|_guard| export::export(&mut self.scene, format));

        match &result {
            Ok(_) => self
                .notifications
                .push(Notification::success(format!("Image exported as {}!", format.name))),
            Err(e) => self.notifications.push(Notification::from_error(e)),
        }
        result
    }

    pub async fn apply_extend(&mut self) -> PipelineResult<ApplyOutcome> {
        self.apply_tool(|tools| &mut tools.extend).await
    }

    pub async fn apply_crop(&mut self) -> PipelineResult<ApplyOutcome> {
        self.apply_tool(|tools| &mut tools.crop).await
    }

    pub async fn apply_background(&mut self) -> PipelineResult<ApplyOutcome> {
        self.apply_tool(|tools| &mut tools.background).await
    }

    pub async fn apply_effect(&mut self) -> PipelineResult<ApplyOutcome> {
        self.apply_tool(|tools| &mut tools.effect).await
    }

    async fn apply_tool<F>(&mut self, select: F) -> PipelineResult<ApplyOutcome>
    where
        F: FnOnce(&mut ToolSet) -> &mut dyn Tool,
    {
        let tool = select(&mut self.tools);
        let success_message = tool.success_message();

        let mut ctx = ApplyContext {
            scene: &mut self.scene,
            store: self.store.as_ref(),
            projects: self.projects.as_ref(),
            project_id: self.project.id,
            gate: &self.gate,
        };
        let result = tool.apply(&mut ctx).await;

        match &result {
            Ok(outcome) => {
                outcome.update.apply_to(&mut self.project);
                self.notifications
                    .extend(outcome.notifications(success_message));
            }
            Err(e) => {
                tracing::debug!(tool = tool.name(), error = %e, "Tool apply failed");
                self.notifications.push(Notification::from_error(e));
                tool.acknowledge_error();
            }
        }
        result
    }
}

/// An original image chosen for a new project
#[derive(Debug, Clone)]
pub struct NewProjectUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    /// Defaults to the file stem
    pub title: Option<String>,
}

impl NewProjectUpload {
    fn resolved_title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(String::from)
            .or_else(|| {
                let name = self.filename.rsplit(['/', '\\']).next().unwrap_or("");
                let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem).trim();
                (!stem.is_empty()).then(|| stem.to_string())
            })
            .unwrap_or_else(|| UNTITLED_PROJECT.to_string())
    }
}

/// Upload an original and create a project around it
pub async fn create_project(
    store: &dyn AssetStore,
    projects: &dyn ProjectStore,
    config: &EditorConfig,
    upload: NewProjectUpload,
) -> PipelineResult<Project> {
    if upload.data.len() > config.max_upload_bytes {
        return Err(PipelineError::Upload(format!(
            "File size must be less than {}MB",
            config.max_upload_bytes / (1024 * 1024)
        )));
    }
    if !config.accepts_extension(&upload.filename) {
        return Err(PipelineError::Upload(format!(
            "Please select a valid image file ({})",
            config.allowed_extensions.join(", ").to_uppercase()
        )));
    }

    let title = upload.resolved_title();
    let size_bytes = upload.data.len();
    let uploaded = store
        .upload(&upload.filename, &upload.content_type, upload.data)
        .await
        .map_err(|e| {
            tracing::warn!(filename = %upload.filename, error = %e, "Upload failed");
            e.into_upload_error()
        })?;

    let request = CreateProjectRequest {
        title,
        original_image_url: uploaded.reference.clone(),
        current_image_url: uploaded.reference.clone(),
        thumbnail_url: uploaded.thumbnail_reference.clone(),
        width: uploaded.width.unwrap_or(config.default_canvas_width),
        height: uploaded.height.unwrap_or(config.default_canvas_height),
        canvas_state: None,
    };

    let id = projects.create_project(request.clone()).await?;
    tracing::info!(
        project_id = %id,
        reference = %uploaded.reference,
        size_bytes = size_bytes,
        width = request.width,
        height = request.height,
        "Project created"
    );

    let now = Utc::now();
    Ok(Project {
        id,
        title: request.title,
        original_image_url: request.original_image_url,
        current_image_url: request.current_image_url,
        thumbnail_url: request.thumbnail_url,
        width: request.width,
        height: request.height,
        canvas_state: None,
        active_transformations: None,
        background_removed: false,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, title: Option<&str>) -> NewProjectUpload {
        NewProjectUpload {
            filename: filename.to_string(),
            content_type: "image/png".to_string(),
            data: vec![0; 8],
            title: title.map(String::from),
        }
    }

    #[test]
    fn test_title_defaults() {
        assert_eq!(upload("beach.png", None).resolved_title(), "beach");
        assert_eq!(upload("beach.png", Some("  ")).resolved_title(), "beach");
        assert_eq!(upload("beach.png", Some(" Summer ")).resolved_title(), "Summer");
        assert_eq!(upload("my.holiday.jpg", None).resolved_title(), "my.holiday");
        assert_eq!(upload(".png", None).resolved_title(), UNTITLED_PROJECT);
        assert_eq!(upload("", None).resolved_title(), UNTITLED_PROJECT);
    }
}
