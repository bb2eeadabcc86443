use async_trait::async_trait;
use pixora_core::{PipelineError, PipelineResult, ProjectUpdate, TransformOperation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{apply_operations, ApplyContext, ApplyOutcome, Tool, ToolState, ToolStateMachine};

/// Single-token AI effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiEffect {
    Upscale,
    Retouch,
}

impl AiEffect {
    pub fn operation(self) -> TransformOperation {
        match self {
            AiEffect::Upscale => TransformOperation::upscale(),
            AiEffect::Retouch => TransformOperation::retouch(),
        }
    }
}

impl FromStr for AiEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upscale" => Ok(AiEffect::Upscale),
            "retouch" => Ok(AiEffect::Retouch),
            _ => Err(format!("Unknown effect: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EffectTool {
    effect: Option<AiEffect>,
    machine: ToolStateMachine,
}

impl EffectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effect(&self) -> Option<AiEffect> {
        self.effect
    }

    pub fn select(&mut self, effect: Option<AiEffect>) {
        self.effect = effect;
        self.machine.parameters_changed(effect.is_some());
    }
}

#[async_trait]
impl Tool for EffectTool {
    fn name(&self) -> &'static str {
        "effect"
    }

    fn state(&self) -> &ToolState {
        self.machine.state()
    }

    fn progress_message(&self) -> &'static str {
        match self.effect {
            Some(AiEffect::Retouch) => "Retouching image...",
            _ => "Upscaling image...",
        }
    }

    fn success_message(&self) -> &'static str {
        match self.effect {
            Some(AiEffect::Retouch) => "Image retouched successfully!",
            _ => "Image upscaled successfully!",
        }
    }

    async fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> PipelineResult<ApplyOutcome> {
        let effect = self.effect.ok_or(PipelineError::NoOperations)?;
        self.machine.begin(true)?;
        let result = apply_operations(
            ctx,
            vec![effect.operation()],
            self.progress_message(),
            ProjectUpdate::default(),
        )
        .await;

        let result = self.machine.finish(result);
        if result.is_ok() {
            self.effect = None;
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
    fn test_effect_tokens() {
        assert_eq!(AiEffect::Upscale.operation().step().unwrap(), "e-upscale");
        assert_eq!(AiEffect::Retouch.operation().step().unwrap(), "e-retouch");
    }

    #[test]
    fn test_select_effect() {
        let mut tool = EffectTool::new();
        tool.select(Some(AiEffect::Retouch));
        assert_eq!(tool.state(), &ToolState::ParametersSelected);
        assert_eq!(tool.progress_message(), "Retouching image...");
        tool.select(None);
        assert_eq!(tool.state(), &ToolState::Idle);
        assert_eq!("UPSCALE".parse::<AiEffect>(), Ok(AiEffect::Upscale));
    }
}
