use async_trait::async_trait;
use pixora_core::{PipelineError, PipelineResult, ProjectUpdate, TransformOperation};

use super::{apply_operations, ApplyContext, ApplyOutcome, Tool, ToolState, ToolStateMachine};
use crate::adapter::{effective_geometry, require_main_image};
use crate::scene::{CropWindow, Scene};

/// Crop window for a corner handle dragged to `(local_x, local_y)`.
///
/// The point is relative to the image centre in intrinsic pixels; the window
/// shrinks symmetrically around the centre.
pub fn crop_window_from_local(width: f64, height: f64, local_x: f64, local_y: f64) -> CropWindow {
    let crop_x = (-local_x + width / 2.0).max(0.0);
    let crop_y = (-local_y + height / 2.0).max(0.0);
    CropWindow {
        crop_x,
        crop_y,
        width: (width - crop_x * 2.0).max(1.0),
        height: (height - crop_y * 2.0).max(1.0),
    }
}

#[derive(Debug, Clone, Default)]
pub struct CropTool {
    region: Option<CropWindow>,
    machine: ToolStateMachine,
}

impl CropTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self) -> Option<CropWindow> {
        self.region
    }

    /// Select an explicit crop window in intrinsic pixels
    pub fn select_region(&mut self, region: CropWindow) {
        self.region = Some(region);
        self.machine.parameters_changed(true);
    }

    pub fn clear(&mut self) {
        self.region = None;
        self.machine.parameters_changed(false);
    }

    /// Adopt the crop fields already set on the main image, if any
    pub fn sync_from_scene(&mut self, scene: &Scene) {
        if let Some(image) = crate::adapter::locate_main_image(scene) {
            if !image.crop.is_uncropped() {
                self.select_region(image.crop);
            }
        }
    }

    /// Drag a corner handle to canvas point `(x, y)`
    pub fn crop_from_handle(&mut self, scene: &Scene, x: f64, y: f64) -> PipelineResult<CropWindow> {
        let image = require_main_image(scene)?;
        let displayed = effective_geometry(image);
        let (left, top) = image.placement.top_left(displayed.width, displayed.height);
        let centre_x = left + displayed.width / 2.0;
        let centre_y = top + displayed.height / 2.0;

        let scale_x = if image.placement.scale_x == 0.0 { 1.0 } else { image.placement.scale_x };
        let scale_y = if image.placement.scale_y == 0.0 { 1.0 } else { image.placement.scale_y };
        let local_x = (x - centre_x) / scale_x;
        let local_y = (y - centre_y) / scale_y;

        let window = crop_window_from_local(
            f64::from(image.intrinsic.width),
            f64::from(image.intrinsic.height),
            local_x,
            local_y,
        );
        self.select_region(window);
        Ok(window)
    }

    async fn run(&self, ctx: &mut ApplyContext<'_>, region: CropWindow) -> PipelineResult<ApplyOutcome> {
        require_main_image(ctx.scene)?;

        let operation = TransformOperation::crop(region.crop_x, region.crop_y, region.width, region.height);
        apply_operations(ctx, vec![operation], self.progress_message(), ProjectUpdate::default()).await
    }
}

#[async_trait]
impl Tool for CropTool {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn state(&self) -> &ToolState {
        self.machine.state()
    }

    fn progress_message(&self) -> &'static str {
        "Cropping image..."
    }

    fn success_message(&self) -> &'static str {
        "Image cropped successfully!"
    }

    async fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> PipelineResult<ApplyOutcome> {
        let region = self
            .region
            .filter(|region| !region.is_uncropped())
            .ok_or(PipelineError::NoOperations)?;
        self.machine.begin(true)?;
        let result = self.run(ctx, region).await;
        let result = self.machine.finish(result);
        if result.is_ok() {
            self.region = None;
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
    use crate::scene::{EditableImage, Placement, SceneObject};
    use pixora_core::{AssetReference, PixelSize};

    #[test]
    fn test_crop_window_from_local() {
        let window = crop_window_from_local(400.0, 200.0, 150.0, 80.0);
        assert_eq!(window.crop_x, 50.0);
        assert_eq!(window.crop_y, 20.0);
        assert_eq!(window.width, 300.0);
        assert_eq!(window.height, 160.0);
    }

    #[test]
    fn test_crop_window_clamps() {
        // Handle dragged outside the image crops nothing
        let window = crop_window_from_local(400.0, 200.0, 300.0, 150.0);
        assert!(window.is_uncropped());
        assert_eq!((window.width, window.height), (400.0, 200.0));

        // Handle dragged past the centre keeps at least one pixel
        let window = crop_window_from_local(400.0, 200.0, -300.0, -150.0);
        assert_eq!((window.width, window.height), (1.0, 1.0));
    }

    #[test]
    fn test_crop_from_handle_uses_scene_coordinates() {
        let mut scene = Scene::new(800, 600);
        let mut image = EditableImage::new(AssetReference::new("img.png"), PixelSize::new(400, 200));
        image.placement = Placement::centered(400.0, 300.0, 0.5);
        scene.push(SceneObject::Image(image));

        let mut tool = CropTool::new();
        // 0.5 scale: a canvas offset of 75 from the centre is 150 intrinsic pixels
        let window = tool.crop_from_handle(&scene, 475.0, 340.0).unwrap();
        assert_eq!(window.crop_x, 50.0);
        assert_eq!(window.crop_y, 20.0);
        assert_eq!(tool.state(), &ToolState::ParametersSelected);
        assert_eq!(tool.region(), Some(window));
    }

    #[test]
    fn test_crop_from_handle_without_image() {
        let mut tool = CropTool::new();
        let result = tool.crop_from_handle(&Scene::new(800, 600), 0.0, 0.0);
        assert_eq!(result, Err(PipelineError::NoEditableObject));
    }

    #[test]
    fn test_sync_from_scene_ignores_uncropped_image() {
        let mut scene = Scene::new(800, 600);
        scene.push(SceneObject::Image(EditableImage::new(
            AssetReference::new("img.png"),
            PixelSize::new(400, 200),
        )));
        let mut tool = CropTool::new();
        tool.sync_from_scene(&scene);
        assert_eq!(tool.region(), None);
        assert_eq!(tool.state(), &ToolState::Idle);
    }
}
