//! Tool controllers
//!
//! Every tool follows the same state machine and the same apply flow:
//! acquire the processing gate, locate the main image, build the new
//! reference, swap the object, snapshot the scene and persist. Failures are
//! returned as `PipelineError`s and turned into `Notification`s by the
//! session; nothing escapes to a global handler.

pub mod background;
pub mod crop;
pub mod effect;
pub mod extend;

pub use background::{BackgroundMode, BackgroundTool};
pub use crop::{crop_window_from_local, CropTool};
pub use effect::{AiEffect, EffectTool};
pub use extend::{ExtendPreview, ExtendTool, ExtensionStrategy};

use async_trait::async_trait;
use pixora_core::{
    AssetReference, ErrorMetadata, LogLevel, PipelineError, PipelineResult, ProjectStore,
    ProjectUpdate, TransformOperation, TransformUrlBuilder,
};
use pixora_storage::AssetStore;
use serde::Serialize;
use uuid::Uuid;

use crate::adapter::{require_main_image, stage};
use crate::gate::ProcessingGate;
use crate::scene::{ObjectId, Scene};
use crate::serializer::serialize;

/// Lifecycle of a tool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolState {
    #[default]
    Idle,
    ParametersSelected,
    Applying,
    /// Last apply failed; parameters are retained
    Error(String),
}

/// State machine shared by all tools
#[derive(Debug, Clone, Default)]
pub struct ToolStateMachine {
    state: ToolState,
}

impl ToolStateMachine {
    pub fn state(&self) -> &ToolState {
        &self.state
    }

    /// Track a parameter change; an error is kept until acknowledged
    pub(crate) fn parameters_changed(&mut self, has_parameters: bool) {
        match self.state {
            ToolState::Applying | ToolState::Error(_) => {}
            _ if has_parameters => self.state = ToolState::ParametersSelected,
            _ => self.state = ToolState::Idle,
        }
    }

    pub(crate) fn begin(&mut self, has_parameters: bool) -> PipelineResult<()> {
        match self.state {
            ToolState::ParametersSelected if has_parameters => {
                self.state = ToolState::Applying;
                Ok(())
            }
            ToolState::Applying => Err(PipelineError::Busy("Tool is already applying".to_string())),
            _ => Err(PipelineError::NoOperations),
        }
    }

    /// Leave `Applying`: Idle on success, Error on failure
    pub(crate) fn finish<T>(&mut self, result: PipelineResult<T>) -> PipelineResult<T> {
        match &result {
            Ok(_) => self.state = ToolState::Idle,
            Err(e) => self.state = ToolState::Error(e.user_message()),
        }
        result
    }

    pub fn acknowledge_error(&mut self) {
        if matches!(self.state, ToolState::Error(_)) {
            self.state = ToolState::ParametersSelected;
        }
    }
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notification {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn from_error(error: &PipelineError) -> Self {
        let level = match error.log_level() {
            LogLevel::Debug => NotificationLevel::Info,
            LogLevel::Warn => NotificationLevel::Warning,
            LogLevel::Error => NotificationLevel::Error,
        };
        Notification {
            level,
            message: error.user_message(),
        }
    }
}

/// Result of a committed transformation
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub reference: AssetReference,
    pub object_id: ObjectId,
    /// Project fields sent to persistence
    pub update: ProjectUpdate,
    /// Set when the canvas changed but persisting it failed
    pub save_error: Option<PipelineError>,
}

impl ApplyOutcome {
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }

    /// Success message, followed by a save warning when persisting failed
    pub fn notifications(&self, success_message: &str) -> Vec<Notification> {
        let mut notifications = vec![Notification::success(success_message)];
        if let Some(error) = &self.save_error {
            notifications.push(Notification::warning(format!(
                "Changes applied but not saved: {}",
                error.user_message()
            )));
        }
        notifications
    }
}

/// Collaborators a tool needs to apply a transformation
pub struct ApplyContext<'a> {
    pub scene: &'a mut Scene,
    pub store: &'a dyn AssetStore,
    pub projects: &'a dyn ProjectStore,
    pub project_id: Uuid,
    pub gate: &'a ProcessingGate,
}

/// Common behaviour of tool controllers
#[async_trait]
pub trait Tool: Send {
    fn name(&self) -> &'static str;

    fn state(&self) -> &ToolState;

    /// Message shown while the tool is applying
    fn progress_message(&self) -> &'static str;

    /// Message shown after a successful apply
    fn success_message(&self) -> &'static str;

    async fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> PipelineResult<ApplyOutcome>;

    fn acknowledge_error(&mut self);
}

/// Append `operations` to the main image's chain and swap in the result.
///
/// `extra` carries tool-specific project fields; the current reference,
/// canvas snapshot and chain are always filled in here. A persistence
/// failure is reported in `ApplyOutcome::save_error` and does not roll back
/// the canvas.
pub async fn apply_operations(
    ctx: &mut ApplyContext<'_>,
    operations: Vec<TransformOperation>,
    message: &str,
    extra: ProjectUpdate,
) -> PipelineResult<ApplyOutcome> {
    let _guard = ctx.gate.try_acquire(message)?;

    let (old_id, source) = {
        let image = require_main_image(ctx.scene)?;
        (image.id, image.source.clone())
    };

    let reference = TransformUrlBuilder::from_operations(operations).build(&source)?;
    let staged = stage(ctx.store, &reference).await?;
    let object_id = staged.commit(ctx.scene, Some(old_id));

    let update = ProjectUpdate {
        current_image_url: Some(reference.clone()),
        canvas_state: Some(serialize(ctx.scene).to_json()?),
        active_transformations: Some(reference.chain().map(String::from)),
        ..extra
    };

    let save_error = match ctx.projects.update_project(ctx.project_id, update.clone()).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(
                project_id = %ctx.project_id,
                reference = %reference,
                error = %e,
                "Transformation applied but project save failed"
            );
            Some(e)
        }
    };

    tracing::info!(
        project_id = %ctx.project_id,
        reference = %reference,
        saved = save_error.is_none(),
        "Applied transformation"
    );

    Ok(ApplyOutcome {
        reference,
        object_id,
        update,
        save_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_happy_path() {
        let mut machine = ToolStateMachine::default();
        assert_eq!(machine.state(), &ToolState::Idle);

        machine.parameters_changed(true);
        assert_eq!(machine.state(), &ToolState::ParametersSelected);

        machine.begin(true).unwrap();
        assert_eq!(machine.state(), &ToolState::Applying);

        machine.finish(Ok(())).unwrap();
        assert_eq!(machine.state(), &ToolState::Idle);
    }

    #[test]
    fn test_state_machine_requires_parameters() {
        let mut machine = ToolStateMachine::default();
        assert_eq!(machine.begin(false), Err(PipelineError::NoOperations));
        assert_eq!(machine.state(), &ToolState::Idle);

        machine.parameters_changed(true);
        machine.parameters_changed(false);
        assert_eq!(machine.state(), &ToolState::Idle);
    }

    #[test]
    fn test_state_machine_error_then_acknowledge() {
        let mut machine = ToolStateMachine::default();
        machine.parameters_changed(true);
        machine.begin(true).unwrap();

        let result: PipelineResult<()> =
            machine.finish(Err(PipelineError::AssetFetch("timeout".to_string())));
        assert!(result.is_err());
        assert!(matches!(machine.state(), ToolState::Error(_)));

        // Parameter edits do not clear an unacknowledged error
        machine.parameters_changed(true);
        assert!(matches!(machine.state(), ToolState::Error(_)));

        machine.acknowledge_error();
        assert_eq!(machine.state(), &ToolState::ParametersSelected);
    }

    #[test]
    fn test_notification_from_error() {
        let notification = Notification::from_error(&PipelineError::NoEditableObject);
        assert_eq!(notification.level, NotificationLevel::Info);
        assert_eq!(notification.message, "Please add an image first");

        let notification =
            Notification::from_error(&PipelineError::AssetFetch("reset".to_string()));
        assert_eq!(notification.level, NotificationLevel::Warning);
    }

    #[test]
    fn test_outcome_notifications_include_save_warning() {
        let outcome = ApplyOutcome {
            reference: AssetReference::new("img.png?tr=e-upscale"),
            object_id: Uuid::new_v4(),
            update: ProjectUpdate::default(),
            save_error: Some(PipelineError::Persistence("503".to_string())),
        };
        let notifications = outcome.notifications("Image upscaled");
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].level, NotificationLevel::Success);
        assert_eq!(notifications[1].level, NotificationLevel::Warning);
        assert!(!outcome.is_saved());
    }
}
