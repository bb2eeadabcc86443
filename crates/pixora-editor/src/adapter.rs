//! Editable object adapter
//!
//! Locates the main image in a scene, reports its effective geometry and
//! swaps it for a freshly fetched transformed image. The swap runs in two
//! phases: `stage` fetches and decodes without touching the scene, then
//! `StagedImage::commit` performs the in-memory replacement. A failed fetch
//! therefore leaves the scene exactly as it was.

use pixora_core::{
    AssetReference, PipelineError, PipelineResult, PixelSize, TransformUrlParser,
};
use pixora_storage::{AssetStore, FetchedImage};

use crate::scene::{EditableImage, ObjectId, Placement, Scene, SceneObject};

/// Displayed size of an object: intrinsic size times scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedSize {
    pub width: f64,
    pub height: f64,
}

/// First image-typed object in stacking order
pub fn locate_main_image(scene: &Scene) -> Option<&EditableImage> {
    scene.images().next()
}

pub fn effective_geometry(image: &EditableImage) -> DisplayedSize {
    DisplayedSize {
        width: f64::from(image.intrinsic.width) * image.placement.scale_x,
        height: f64::from(image.intrinsic.height) * image.placement.scale_y,
    }
}

/// Uniform scale that fits an image inside the canvas, never enlarging it
pub fn fit_to_canvas_scale(canvas_width: u32, canvas_height: u32, image_width: u32, image_height: u32) -> f64 {
    if image_width == 0 || image_height == 0 {
        return 1.0;
    }
    let scale_x = f64::from(canvas_width) / f64::from(image_width);
    let scale_y = f64::from(canvas_height) / f64::from(image_height);
    scale_x.min(scale_y).min(1.0)
}

/// Whether the image's chain removed or replaced its background
pub fn has_background_removal(image: &EditableImage) -> bool {
    TransformUrlParser::parse(&image.source).has_background_removal()
}

/// A fetched image ready to be swapped into a scene
#[derive(Debug, Clone)]
pub struct StagedImage {
    fetched: FetchedImage,
}

/// Fetch and decode `reference` without touching any scene
pub async fn stage(store: &dyn AssetStore, reference: &AssetReference) -> PipelineResult<StagedImage> {
    match store.fetch(reference).await {
        Ok(fetched) => {
            tracing::debug!(
                reference = %reference,
                width = fetched.width,
                height = fetched.height,
                backend = store.backend_name(),
                "Staged transformed image"
            );
            Ok(StagedImage { fetched })
        }
        Err(e) => {
            tracing::warn!(reference = %reference, error = %e, "Failed to fetch transformed image");
            Err(e.into_fetch_error())
        }
    }
}

impl StagedImage {
    pub fn reference(&self) -> &AssetReference {
        &self.fetched.reference
    }

    pub fn size(&self) -> PixelSize {
        self.fetched.size()
    }

    /// Swap the staged image into `scene`.
    ///
    /// The new object is fitted to the canvas, centred with centre origins,
    /// made selectable and evented, inserted at the stacking index of the
    /// object it replaces (or on top when there is none) and made active.
    pub fn commit(self, scene: &mut Scene, replacing: Option<ObjectId>) -> ObjectId {
        let size = self.fetched.size();
        let scale = fit_to_canvas_scale(scene.width(), scene.height(), size.width, size.height);

        let mut image = EditableImage::new(self.fetched.reference, size)
            .with_pixels(self.fetched.image);
        image.placement = Placement::centered(
            f64::from(scene.width()) / 2.0,
            f64::from(scene.height()) / 2.0,
            scale,
        );
        image.selectable = true;
        image.evented = true;
        let id = image.id;

        let index = replacing
            .and_then(|old| scene.remove(old))
            .map(|(index, _)| index);

        match index {
            Some(index) => scene.insert_at(index, SceneObject::Image(image)),
            None => scene.push(SceneObject::Image(image)),
        }
        scene.set_active(Some(id));

        tracing::info!(object_id = %id, scale = scale, "Replaced editable image");
        id
    }
}

/// Stage then commit in one step
pub async fn replace(
    scene: &mut Scene,
    store: &dyn AssetStore,
    old: Option<ObjectId>,
    new_reference: &AssetReference,
) -> PipelineResult<ObjectId> {
    let staged = stage(store, new_reference).await?;
    Ok(staged.commit(scene, old))
}

/// Main image or `NoEditableObject`
pub(crate) fn require_main_image(scene: &Scene) -> PipelineResult<&EditableImage> {
    locate_main_image(scene).ok_or(PipelineError::NoEditableObject)
}
