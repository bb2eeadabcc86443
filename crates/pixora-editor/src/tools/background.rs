use async_trait::async_trait;
use pixora_core::{PipelineError, PipelineResult, ProjectUpdate, TransformOperation};
use serde::{Deserialize, Serialize};

use super::{apply_operations, ApplyContext, ApplyOutcome, Tool, ToolState, ToolStateMachine};

/// What to do with the background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BackgroundMode {
    Remove,
    /// Generate a new background from a prompt
    Replace { prompt: String },
}

impl BackgroundMode {
    pub fn operation(&self) -> TransformOperation {
        match self {
            BackgroundMode::Remove => TransformOperation::background_remove(),
            BackgroundMode::Replace { prompt } => TransformOperation::background_replace(prompt),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            BackgroundMode::Remove => true,
            BackgroundMode::Replace { prompt } => !prompt.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackgroundTool {
    mode: Option<BackgroundMode>,
    machine: ToolStateMachine,
}

impl BackgroundTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<&BackgroundMode> {
        self.mode.as_ref()
    }

    pub fn select(&mut self, mode: BackgroundMode) {
        let complete = mode.is_complete();
        self.mode = Some(mode);
        self.machine.parameters_changed(complete);
    }

    pub fn clear(&mut self) {
        self.mode = None;
        self.machine.parameters_changed(false);
    }
}

#[async_trait]
impl Tool for BackgroundTool {
    fn name(&self) -> &'static str {
        "background"
    }

    fn state(&self) -> &ToolState {
        self.machine.state()
    }

    fn progress_message(&self) -> &'static str {
        match self.mode {
            Some(BackgroundMode::Replace { .. }) => "Replacing background...",
            _ => "Removing background...",
        }
    }

    fn success_message(&self) -> &'static str {
        match self.mode {
            Some(BackgroundMode::Replace { .. }) => "Background replaced successfully!",
            _ => "Background removed successfully!",
        }
    }

    async fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> PipelineResult<ApplyOutcome> {
        let mode = self
            .mode
            .clone()
            .filter(BackgroundMode::is_complete)
            .ok_or(PipelineError::NoOperations)?;
        self.machine.begin(true)?;

        let update = ProjectUpdate {
            background_removed: Some(true),
            ..ProjectUpdate::default()
        };
        let result = apply_operations(ctx, vec![mode.operation()], self.progress_message(), update).await;

        let result = self.machine.finish(result);
        if result.is_ok() {
            self.mode = None;
        }
        result
    }

    fn acknowledge_error(&mut self) {
        self.machine.acknowledge_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_needs_prompt() {
        let mut tool = BackgroundTool::new();
        tool.select(BackgroundMode::Replace {
            prompt: "  ".to_string(),
        });
        assert_eq!(tool.state(), &ToolState::Idle);

        tool.select(BackgroundMode::Replace {
            prompt: "sunny beach".to_string(),
        });
        assert_eq!(tool.state(), &ToolState::ParametersSelected);
        assert_eq!(tool.progress_message(), "Replacing background...");
    }

    #[test]
    fn test_mode_operations() {
        assert_eq!(
            BackgroundMode::Remove.operation(),
            TransformOperation::background_remove()
        );
        let replace = BackgroundMode::Replace {
            prompt: "forest".to_string(),
        };
        assert_eq!(replace.operation().step().unwrap(), "e-changebg-prompt-forest");
    }
}
