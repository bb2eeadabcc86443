//! Scene model
//!
//! A scene is the editor's in-memory canvas: fixed logical dimensions, a
//! background colour, an ordered object list, the active selection and the
//! viewport. Readers get immutable accessors; mutation is crate-private so
//! only the adapter, the serializer and the export renderer can change it.

use image::DynamicImage;
use pixora_core::{AssetReference, PixelSize};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub type ObjectId = Uuid;

pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Horizontal anchor of an object's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginX {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchor of an object's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginY {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Position, anchors, scale and rotation of an object on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
    pub scale_x: f64,
    pub scale_y: f64,
    #[serde(default)]
    pub angle: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Placement {
            left: 0.0,
            top: 0.0,
            origin_x: OriginX::Left,
            origin_y: OriginY::Top,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
        }
    }
}

impl Placement {
    /// Centred on `(x, y)` with centre origins and a uniform scale
    pub fn centered(x: f64, y: f64, scale: f64) -> Self {
        Placement {
            left: x,
            top: y,
            origin_x: OriginX::Center,
            origin_y: OriginY::Center,
            scale_x: scale,
            scale_y: scale,
            angle: 0.0,
        }
    }

    /// Top-left corner of a box of the given displayed size
    pub fn top_left(&self, displayed_width: f64, displayed_height: f64) -> (f64, f64) {
        let x = match self.origin_x {
            OriginX::Left => self.left,
            OriginX::Center => self.left - displayed_width / 2.0,
            OriginX::Right => self.left - displayed_width,
        };
        let y = match self.origin_y {
            OriginY::Top => self.top,
            OriginY::Center => self.top - displayed_height / 2.0,
            OriginY::Bottom => self.top - displayed_height,
        };
        (x, y)
    }
}

/// Visible window of an image, in intrinsic pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropWindow {
    pub crop_x: f64,
    pub crop_y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropWindow {
    /// Window covering the whole image
    pub fn full(size: PixelSize) -> Self {
        CropWindow {
            crop_x: 0.0,
            crop_y: 0.0,
            width: f64::from(size.width),
            height: f64::from(size.height),
        }
    }

    /// A window anchored at the origin crops nothing
    pub fn is_uncropped(&self) -> bool {
        self.crop_x == 0.0 && self.crop_y == 0.0
    }
}

/// The image object that transformations target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableImage {
    pub id: ObjectId,
    pub source: AssetReference,
    pub intrinsic: PixelSize,
    pub placement: Placement,
    pub crop: CropWindow,
    pub selectable: bool,
    pub evented: bool,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(skip)]
    pub(crate) pixels: Option<Arc<DynamicImage>>,
}

impl EditableImage {
    pub fn new(source: AssetReference, intrinsic: PixelSize) -> Self {
        EditableImage {
            id: Uuid::new_v4(),
            source,
            intrinsic,
            placement: Placement::default(),
            crop: CropWindow::full(intrinsic),
            selectable: true,
            evented: true,
            filters: Vec::new(),
            pixels: None,
        }
    }

    pub(crate) fn with_pixels(mut self, pixels: Arc<DynamicImage>) -> Self {
        self.pixels = Some(pixels);
        self
    }

    /// Decoded pixels, absent until the image is fetched or rehydrated
    pub fn pixels(&self) -> Option<&Arc<DynamicImage>> {
        self.pixels.as_ref()
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }
}

// Equality ignores cached pixels.
impl PartialEq for EditableImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.source == other.source
            && self.intrinsic == other.intrinsic
            && self.placement == other.placement
            && self.crop == other.crop
            && self.selectable == other.selectable
            && self.evented == other.evented
            && self.filters == other.filters
    }
}

/// A text annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextObject {
    pub id: ObjectId,
    pub text: String,
    pub placement: Placement,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_fill")]
    pub fill: String,
}

fn default_font_size() -> f64 {
    24.0
}

fn default_fill() -> String {
    "#000000".to_string()
}

impl TextObject {
    pub fn new(text: impl Into<String>, left: f64, top: f64) -> Self {
        TextObject {
            id: Uuid::new_v4(),
            text: text.into(),
            placement: Placement {
                left,
                top,
                ..Placement::default()
            },
            font_size: default_font_size(),
            fill: default_fill(),
        }
    }
}

/// Any object held by a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SceneObject {
    Image(EditableImage),
    Text(TextObject),
}

impl SceneObject {
    pub fn id(&self) -> ObjectId {
        match self {
            SceneObject::Image(image) => image.id,
            SceneObject::Text(text) => text.id,
        }
    }

    pub fn as_image(&self) -> Option<&EditableImage> {
        match self {
            SceneObject::Image(image) => Some(image),
            SceneObject::Text(_) => None,
        }
    }

    fn as_image_mut(&mut self) -> Option<&mut EditableImage> {
        match self {
            SceneObject::Image(image) => Some(image),
            SceneObject::Text(_) => None,
        }
    }
}

/// Viewport affine transform and zoom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub transform: [f64; 6],
    pub zoom: f64,
}

impl Viewport {
    pub const IDENTITY: Viewport = Viewport {
        transform: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        zoom: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The editing canvas
#[derive(Debug, Clone)]
pub struct Scene {
    width: u32,
    height: u32,
    background: String,
    objects: Vec<SceneObject>,
    active: Option<ObjectId>,
    viewport: Viewport,
}

impl Scene {
    /// Empty scene of the given logical size with a white background
    pub fn new(width: u32, height: u32) -> Self {
        Scene {
            width,
            height,
            background: DEFAULT_BACKGROUND.to_string(),
            objects: Vec::new(),
            active: None,
            viewport: Viewport::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn images(&self) -> impl Iterator<Item = &EditableImage> + '_ {
        self.objects.iter().filter_map(SceneObject::as_image)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    /// Stacking index of an object
    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    pub fn active_id(&self) -> Option<ObjectId> {
        self.active
    }

    pub fn active_object(&self) -> Option<&SceneObject> {
        self.active.and_then(|id| self.object(id))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn set_background(&mut self, background: impl Into<String>) {
        self.background = background.into();
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub(crate) fn set_active(&mut self, id: Option<ObjectId>) {
        self.active = id;
    }

    /// Insert at `index`, clamped to the end of the list
    pub(crate) fn insert_at(&mut self, index: usize, object: SceneObject) {
        let index = index.min(self.objects.len());
        self.objects.insert(index, object);
    }

    pub(crate) fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Remove an object, returning it and its former stacking index
    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<(usize, SceneObject)> {
        let index = self.index_of(id)?;
        let object = self.objects.remove(index);
        if self.active == Some(id) {
            self.active = None;
        }
        Some((index, object))
    }

    pub(crate) fn image_mut(&mut self, id: ObjectId) -> Option<&mut EditableImage> {
        self.objects
            .iter_mut()
            .find(|o| o.id() == id)
            .and_then(SceneObject::as_image_mut)
    }

    /// Drop every object and the selection; dimensions stay
    pub(crate) fn clear(&mut self) {
        self.objects.clear();
        self.active = None;
    }

    pub(crate) fn replace_contents(
        &mut self,
        background: String,
        objects: Vec<SceneObject>,
        viewport: Viewport,
    ) {
        self.background = background;
        self.objects = objects;
        self.viewport = viewport;
        self.active = None;
    }
}
