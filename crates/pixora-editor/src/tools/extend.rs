//! Generative extension
//!
//! Grows the image towards the selected edges and lets the transformation
//! service fill the new area. The original content is pinned to the side
//! opposite the growth via the focus anchor.

use async_trait::async_trait;
use pixora_core::{
    EdgeSet, PipelineError, PipelineResult, PixelSize, ProjectUpdate, TransformOperation,
};
use serde::{Deserialize, Serialize};

use super::{apply_operations, ApplyContext, ApplyOutcome, Tool, ToolState, ToolStateMachine};
use crate::adapter::{effective_geometry, has_background_removal, require_main_image};
use crate::scene::Scene;

pub const MIN_EXTENSION_AMOUNT: u32 = 50;
pub const MAX_EXTENSION_AMOUNT: u32 = 500;
pub const EXTENSION_STEP: u32 = 25;
pub const DEFAULT_EXTENSION_AMOUNT: u32 = 200;

/// How the amount is applied to selected edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionStrategy {
    /// Each axis grows by the amount once if any of its edges is selected
    #[default]
    PerAxis,
    /// Each selected edge contributes the amount
    PerEdge,
}

impl ExtensionStrategy {
    /// Extended size of a `width` x `height` image, rounded to whole pixels
    pub fn extended_size(self, width: f64, height: f64, directions: EdgeSet, amount: u32) -> PixelSize {
        let amount = f64::from(amount);
        let horizontal = directions & (EdgeSet::LEFT | EdgeSet::RIGHT);
        let vertical = directions & (EdgeSet::TOP | EdgeSet::BOTTOM);

        let (grow_x, grow_y) = match self {
            ExtensionStrategy::PerAxis => (
                if directions.grows_horizontally() { amount } else { 0.0 },
                if directions.grows_vertically() { amount } else { 0.0 },
            ),
            ExtensionStrategy::PerEdge => (
                amount * f64::from(horizontal.bits().count_ones()),
                amount * f64::from(vertical.bits().count_ones()),
            ),
        };

        PixelSize::new(
            (width + grow_x).round().max(1.0) as u32,
            (height + grow_y).round().max(1.0) as u32,
        )
    }
}

impl std::str::FromStr for ExtensionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-axis" | "axis" => Ok(ExtensionStrategy::PerAxis),
            "per-edge" | "edge" => Ok(ExtensionStrategy::PerEdge),
            _ => Err(format!("Unknown extension strategy: {}", s)),
        }
    }
}

/// Snap to the slider's range and step
pub fn clamp_amount(amount: u32) -> u32 {
    let clamped = amount.clamp(MIN_EXTENSION_AMOUNT, MAX_EXTENSION_AMOUNT);
    let steps = (f64::from(clamped - MIN_EXTENSION_AMOUNT) / f64::from(EXTENSION_STEP)).round() as u32;
    (MIN_EXTENSION_AMOUNT + steps * EXTENSION_STEP).min(MAX_EXTENSION_AMOUNT)
}

/// Current and extended size of the main image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtendPreview {
    pub current: PixelSize,
    pub extended: PixelSize,
}

#[derive(Debug, Clone)]
pub struct ExtendTool {
    directions: EdgeSet,
    amount: u32,
    strategy: ExtensionStrategy,
    machine: ToolStateMachine,
}

impl Default for ExtendTool {
    fn default() -> Self {
        ExtendTool::new(DEFAULT_EXTENSION_AMOUNT)
    }
}

impl ExtendTool {
    pub fn new(amount: u32) -> Self {
        ExtendTool {
            directions: EdgeSet::empty(),
            amount: clamp_amount(amount),
            strategy: ExtensionStrategy::default(),
            machine: ToolStateMachine::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ExtensionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn directions(&self) -> EdgeSet {
        self.directions
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn strategy(&self) -> ExtensionStrategy {
        self.strategy
    }

    pub fn toggle_direction(&mut self, edge: EdgeSet) {
        self.directions.toggle(edge);
        self.machine.parameters_changed(!self.directions.is_empty());
    }

    pub fn set_directions(&mut self, directions: EdgeSet) {
        self.directions = directions;
        self.machine.parameters_changed(!self.directions.is_empty());
    }

    pub fn set_amount(&mut self, amount: u32) {
        self.amount = clamp_amount(amount);
    }

    pub fn set_strategy(&mut self, strategy: ExtensionStrategy) {
        self.strategy = strategy;
    }

    /// Clear the selected directions
    pub fn reset(&mut self) {
        self.directions = EdgeSet::empty();
        self.machine.parameters_changed(false);
    }

    /// Sizes the main image would have before and after extension
    pub fn preview(&self, scene: &Scene) -> PipelineResult<ExtendPreview> {
        let image = require_main_image(scene)?;
        let geometry = effective_geometry(image);
        Ok(ExtendPreview {
            current: PixelSize::new(
                geometry.width.round() as u32,
                geometry.height.round() as u32,
            ),
            extended: self.strategy.extended_size(
                geometry.width,
                geometry.height,
                self.directions,
                self.amount,
            ),
        })
    }

    async fn run(&self, ctx: &mut ApplyContext<'_>) -> PipelineResult<ApplyOutcome> {
        let image = require_main_image(ctx.scene)?;
        if has_background_removal(image) {
            return Err(PipelineError::UnsupportedChain(
                "Cannot extend an image whose background was removed. Extend first, then remove the background.".to_string(),
            ));
        }

        let preview = self.preview(ctx.scene)?;
        tracing::debug!(
            directions = ?self.directions,
            amount = self.amount,
            strategy = ?self.strategy,
            width = preview.extended.width,
            height = preview.extended.height,
            "Extending image"
        );

        let operation = TransformOperation::extend(
            f64::from(preview.extended.width),
            f64::from(preview.extended.height),
            self.directions,
        );
        apply_operations(ctx, vec![operation], self.progress_message(), ProjectUpdate::default()).await
    }
}

#[async_trait]
impl Tool for ExtendTool {
    fn name(&self) -> &'static str {
        "extend"
    }

    fn state(&self) -> &ToolState {
        self.machine.state()
    }

    fn progress_message(&self) -> &'static str {
        "Extending image with AI..."
    }

    fn success_message(&self) -> &'static str {
        "Image extended successfully!"
    }

    async fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> PipelineResult<ApplyOutcome> {
        self.machine.begin(!self.directions.is_empty())?;
        let result = self.run(ctx).await;
        let result = self.machine.finish(result);
        if result.is_ok() {
            self.directions = EdgeSet::empty();
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
    fn test_per_axis_grows_each_axis_once() {
        let strategy = ExtensionStrategy::PerAxis;
        assert_eq!(
            strategy.extended_size(800.0, 600.0, EdgeSet::LEFT, 200),
            PixelSize::new(1000, 600)
        );
        assert_eq!(
            strategy.extended_size(800.0, 600.0, EdgeSet::LEFT | EdgeSet::RIGHT, 200),
            PixelSize::new(1000, 600)
        );
        assert_eq!(
            strategy.extended_size(800.0, 600.0, EdgeSet::all(), 100),
            PixelSize::new(900, 700)
        );
    }

    #[test]
    fn test_per_edge_counts_edges() {
        let strategy = ExtensionStrategy::PerEdge;
        assert_eq!(
            strategy.extended_size(800.0, 600.0, EdgeSet::LEFT | EdgeSet::RIGHT, 200),
            PixelSize::new(1200, 600)
        );
        assert_eq!(
            strategy.extended_size(800.0, 600.0, EdgeSet::TOP, 50),
            PixelSize::new(800, 650)
        );
    }

    #[test]
    fn test_extended_size_rounds() {
        assert_eq!(
            ExtensionStrategy::PerAxis.extended_size(400.4, 300.6, EdgeSet::TOP, 50),
            PixelSize::new(400, 351)
        );
    }

    #[test]
    fn test_clamp_amount() {
        assert_eq!(clamp_amount(10), 50);
        assert_eq!(clamp_amount(200), 200);
        assert_eq!(clamp_amount(210), 200);
        assert_eq!(clamp_amount(213), 225);
        assert_eq!(clamp_amount(9000), 500);
    }

    #[test]
    fn test_direction_selection_drives_state() {
        let mut tool = ExtendTool::default();
        assert_eq!(tool.amount(), 200);
        assert_eq!(tool.state(), &ToolState::Idle);

        tool.toggle_direction(EdgeSet::LEFT);
        assert_eq!(tool.state(), &ToolState::ParametersSelected);

        tool.toggle_direction(EdgeSet::LEFT);
        assert_eq!(tool.state(), &ToolState::Idle);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("per-edge".parse::<ExtensionStrategy>(), Ok(ExtensionStrategy::PerEdge));
        assert_eq!("axis".parse::<ExtensionStrategy>(), Ok(ExtensionStrategy::PerAxis));
        assert!("diagonal".parse::<ExtensionStrategy>().is_err());
    }
}
