//! Canvas state serializer
//!
//! Converts a scene to and from the JSON snapshot stored with a project.
//! Snapshots carry object geometry and source references only; decoded
//! pixels are re-fetched by `rehydrate` after a load.

use pixora_core::{PipelineError, PipelineResult};
use pixora_storage::AssetStore;
use serde::{Deserialize, Serialize};

use crate::scene::{ObjectId, Scene, SceneObject, Viewport, DEFAULT_BACKGROUND};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

/// Serializable form of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub viewport: Viewport,
}

impl CanvasSnapshot {
    pub fn to_json(&self) -> PipelineResult<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| PipelineError::Persistence(format!("Failed to serialize canvas: {}", e)))
    }

    pub fn from_json(value: &serde_json::Value) -> PipelineResult<Self> {
        CanvasSnapshot::deserialize(value)
            .map_err(|e| PipelineError::Persistence(format!("Invalid canvas state: {}", e)))
    }
}

/// Snapshot the scene
pub fn serialize(scene: &Scene) -> CanvasSnapshot {
    CanvasSnapshot {
        version: SNAPSHOT_VERSION,
        width: scene.width(),
        height: scene.height(),
        background: scene.background().to_string(),
        objects: scene.objects().to_vec(),
        viewport: scene.viewport(),
    }
}

/// Replace the scene's contents with a snapshot.
///
/// Scene dimensions are the project's and are kept as they are.
pub fn deserialize(snapshot: &CanvasSnapshot, scene: &mut Scene) {
    if snapshot.width != scene.width() || snapshot.height != scene.height() {
        tracing::warn!(
            snapshot_width = snapshot.width,
            snapshot_height = snapshot.height,
            scene_width = scene.width(),
            scene_height = scene.height(),
            "Canvas snapshot dimensions differ from the project; keeping project dimensions"
        );
    }
    if snapshot.version > SNAPSHOT_VERSION {
        tracing::warn!(version = snapshot.version, "Canvas snapshot is newer than this editor");
    }

    scene.replace_contents(
        snapshot.background.clone(),
        snapshot.objects.clone(),
        snapshot.viewport,
    );
}

/// Fetch pixels for every image that lacks them.
///
/// Returns the number of images fetched. Stops at the first failure; images
/// fetched before it keep their pixels.
pub async fn rehydrate(scene: &mut Scene, store: &dyn AssetStore) -> PipelineResult<usize> {
    let pending: Vec<(ObjectId, pixora_core::AssetReference)> = scene
        .images()
        .filter(|image| !image.has_pixels())
        .map(|image| (image.id, image.source.clone()))
        .collect();

    let mut fetched_count = 0;
    for (id, source) in pending {
        let fetched = store.fetch(&source).await.map_err(|e| {
            tracing::warn!(reference = %source, error = %e, "Failed to rehydrate image");
            e.into_fetch_error()
        })?;

        if let Some(image) = scene.image_mut(id) {
            if image.intrinsic != fetched.size() {
                tracing::debug!(
                    reference = %source,
                    saved_width = image.intrinsic.width,
                    fetched_width = fetched.width,
                    "Fetched size differs from snapshot"
                );
            }
            image.pixels = Some(fetched.image);
            fetched_count += 1;
        }
    }

    Ok(fetched_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EditableImage, Placement, TextObject};
    use image::{DynamicImage, Rgba, RgbaImage};
    use pixora_core::{AssetReference, PixelSize};
    use pixora_storage::MemoryAssetStore;

    fn scene_with_objects() -> Scene {
        let mut scene = Scene::new(800, 600);
        let mut image = EditableImage::new(
            AssetReference::new("img.png?tr=e-bgremove"),
            PixelSize::new(1000, 600),
        );
        image.placement = Placement::centered(400.0, 300.0, 0.8);
        image.filters.push("grayscale".to_string());
        scene.push(SceneObject::Image(image));
        scene.push(SceneObject::Text(TextObject::new("hello", 5.0, 6.0)));
        scene.set_background("#eeeeee");
        scene.set_viewport(Viewport {
            transform: [2.0, 0.0, 0.0, 2.0, -100.0, -50.0],
            zoom: 2.0,
        });
        scene
    }

    #[test]
    fn test_round_trip_reproduces_scene() {
        let scene = scene_with_objects();
        let json = serialize(&scene).to_json().unwrap();

        let snapshot = CanvasSnapshot::from_json(&json).unwrap();
        let mut restored = Scene::new(800, 600);
        deserialize(&snapshot, &mut restored);

        assert_eq!(restored.objects(), scene.objects());
        assert_eq!(restored.background(), "#eeeeee");
        assert_eq!(restored.viewport(), scene.viewport());
        assert_eq!(serialize(&restored), serialize(&scene));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serialize(&scene_with_objects()).to_json().unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["objects"][0]["type"], "image");
        assert_eq!(json["objects"][0]["source"], "img.png?tr=e-bgremove");
        assert!(json["objects"][0].get("pixels").is_none());
        assert_eq!(json["objects"][1]["type"], "text");
    }

    #[test]
    fn test_deserialize_keeps_project_dimensions() {
        let mut snapshot = serialize(&scene_with_objects());
        snapshot.width = 1024;
        let mut scene = Scene::new(800, 600);
        deserialize(&snapshot, &mut scene);
        assert_eq!(scene.width(), 800);
        assert_eq!(scene.objects().len(), 2);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = CanvasSnapshot::from_json(&serde_json::json!({"objects": 3}));
        assert!(matches!(result, Err(PipelineError::Persistence(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let snapshot =
            CanvasSnapshot::from_json(&serde_json::json!({"width": 800, "height": 600})).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.background, "#ffffff");
        assert!(snapshot.viewport.is_identity());
    }

    #[tokio::test]
    async fn test_rehydrate_fetches_missing_pixels() {
        let store = MemoryAssetStore::new();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1000, 600, Rgba([1, 1, 1, 255])));
        store.insert_image("img.png?tr=e-bgremove", &img).unwrap();

        let mut scene = Scene::new(800, 600);
        deserialize(&serialize(&scene_with_objects()), &mut scene);
        assert!(!scene.images().any(|i| i.has_pixels()));

        let count = rehydrate(&mut scene, &store).await.unwrap();
        assert_eq!(count, 1);
        assert!(scene.images().all(|i| i.has_pixels()));

        // Second pass has nothing left to fetch
        assert_eq!(rehydrate(&mut scene, &store).await.unwrap(), 0);
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_rehydrate_failure_is_asset_fetch() {
        let store = MemoryAssetStore::new();
        let mut scene = Scene::new(800, 600);
        deserialize(&serialize(&scene_with_objects()), &mut scene);

        let result = rehydrate(&mut scene, &store).await;
        assert!(matches!(result, Err(PipelineError::AssetFetch(_))));
    }
}
