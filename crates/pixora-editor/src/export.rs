//! Canvas export
//!
//! Renders the scene's image objects onto an RGBA canvas of the project's
//! logical size and encodes it. The viewport is reset to identity for the
//! render and restored afterwards, whatever the outcome.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use pixora_core::{PipelineError, PipelineResult};
use serde::Serialize;
use std::io::Cursor;

use crate::scene::{EditableImage, Scene, SceneObject, Viewport};

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportEncoding {
    Png,
    Jpeg,
    WebP,
}

impl ExportEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            ExportEncoding::Png => "png",
            ExportEncoding::Jpeg => "jpg",
            ExportEncoding::WebP => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportEncoding::Png => "image/png",
            ExportEncoding::Jpeg => "image/jpeg",
            ExportEncoding::WebP => "image/webp",
        }
    }
}

/// Encoding plus quality in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportFormat {
    pub name: &'static str,
    pub encoding: ExportEncoding,
    pub quality: f32,
}

impl ExportFormat {
    pub const PNG: ExportFormat = ExportFormat {
        name: "PNG",
        encoding: ExportEncoding::Png,
        quality: 1.0,
    };
    pub const JPEG_HIGH: ExportFormat = ExportFormat {
        name: "JPEG (High Quality)",
        encoding: ExportEncoding::Jpeg,
        quality: 0.9,
    };
    pub const JPEG_MEDIUM: ExportFormat = ExportFormat {
        name: "JPEG (Medium Quality)",
        encoding: ExportEncoding::Jpeg,
        quality: 0.8,
    };
    pub const WEBP: ExportFormat = ExportFormat {
        name: "WebP",
        encoding: ExportEncoding::WebP,
        quality: 0.9,
    };

    pub const PRESETS: [ExportFormat; 4] = [
        ExportFormat::PNG,
        ExportFormat::JPEG_HIGH,
        ExportFormat::JPEG_MEDIUM,
        ExportFormat::WEBP,
    ];

    /// Look up a preset by short key: `png`, `jpeg`, `jpeg-medium`, `webp`
    pub fn from_key(key: &str) -> Option<ExportFormat> {
        match key.to_lowercase().as_str() {
            "png" => Some(ExportFormat::PNG),
            "jpeg" | "jpg" | "jpeg-high" => Some(ExportFormat::JPEG_HIGH),
            "jpeg-medium" | "jpg-medium" => Some(ExportFormat::JPEG_MEDIUM),
            "webp" => Some(ExportFormat::WEBP),
            _ => None,
        }
    }
}

/// An encoded export
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl ExportedImage {
    /// Download filename for a project title
    pub fn file_name(&self, title: &str) -> String {
        format!("{}.{}", title, self.format.encoding.extension())
    }
}

/// Render and encode the scene
pub fn export(scene: &mut Scene, format: ExportFormat) -> PipelineResult<ExportedImage> {
    let saved = scene.viewport();
    scene.set_viewport(Viewport::IDENTITY);

    let result = render(scene).and_then(|canvas| encode(canvas, format));

    scene.set_viewport(saved);

    match &result {
        Ok(exported) => tracing::info!(
            format = format.name,
            width = exported.width,
            height = exported.height,
            size_bytes = exported.data.len(),
            "Exported canvas"
        ),
        Err(e) => tracing::warn!(format = format.name, error = %e, "Export failed"),
    }
    result
}

/// Rasterize image objects in stacking order
pub fn render(scene: &Scene) -> PipelineResult<RgbaImage> {
    let background = parse_hex_colour(scene.background()).unwrap_or(Rgba([255, 255, 255, 255]));
    let mut canvas = RgbaImage::from_pixel(scene.width(), scene.height(), background);

    for object in scene.objects() {
        match object {
            SceneObject::Image(image) => draw_image(&mut canvas, image)?,
            SceneObject::Text(text) => {
                tracing::debug!(object_id = %text.id, "Text objects are not rasterized on export");
            }
        }
    }

    Ok(canvas)
}

fn draw_image(canvas: &mut RgbaImage, image: &EditableImage) -> PipelineResult<()> {
    let pixels = image.pixels().ok_or_else(|| {
        PipelineError::Export(format!("Image {} has no pixels loaded", image.source))
    })?;

    if image.placement.angle != 0.0 {
        tracing::debug!(object_id = %image.id, angle = image.placement.angle, "Rotation ignored on export");
    }

    let (source_width, source_height) = pixels.dimensions();
    let crop_x = image.crop.crop_x.max(0.0).round() as u32;
    let crop_y = image.crop.crop_y.max(0.0).round() as u32;
    if crop_x >= source_width || crop_y >= source_height {
        return Ok(());
    }
    let crop_width = (image.crop.width.round() as u32).clamp(1, source_width - crop_x);
    let crop_height = (image.crop.height.round() as u32).clamp(1, source_height - crop_y);

    let displayed_width = f64::from(crop_width) * image.placement.scale_x;
    let displayed_height = f64::from(crop_height) * image.placement.scale_y;
    let target_width = displayed_width.round() as u32;
    let target_height = displayed_height.round() as u32;
    if target_width == 0 || target_height == 0 {
        return Ok(());
    }

    let window = pixels.view(crop_x, crop_y, crop_width, crop_height).to_image();
    let scaled = if (target_width, target_height) == (crop_width, crop_height) {
        window
    } else {
        imageops::resize(&window, target_width, target_height, FilterType::Triangle)
    };

    let (left, top) = image.placement.top_left(displayed_width, displayed_height);
    imageops::overlay(canvas, &scaled, left.round() as i64, top.round() as i64);
    Ok(())
}

fn encode(canvas: RgbaImage, format: ExportFormat) -> PipelineResult<ExportedImage> {
    let (width, height) = canvas.dimensions();
    let quality = format.quality.clamp(0.0, 1.0);

    let data = match format.encoding {
        ExportEncoding::Png => {
            let mut buffer = Vec::new();
            DynamicImage::ImageRgba8(canvas)
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| PipelineError::Export(format!("PNG encoding failed: {}", e)))?;
            Bytes::from(buffer)
        }
        ExportEncoding::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            let mut buffer = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, (quality * 100.0).round() as u8);
            rgb.write_with_encoder(encoder)
                .map_err(|e| PipelineError::Export(format!("JPEG encoding failed: {}", e)))?;
            Bytes::from(buffer)
        }
        ExportEncoding::WebP => {
            let encoder = webp::Encoder::from_rgba(&canvas, width, height);
            let encoded = encoder.encode(quality * 100.0);
            Bytes::copy_from_slice(&encoded)
        }
    };

    Ok(ExportedImage {
        format,
        width,
        height,
        data,
    })
}

/// Parse `#rrggbb` or `#rgb`
fn parse_hex_colour(value: &str) -> Option<Rgba<u8>> {
    let hex = value.strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Placement, TextObject};
    use pixora_core::{AssetReference, PixelSize};
    use std::sync::Arc;

    fn red_image(width: u32, height: u32) -> EditableImage {
        let pixels = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255])));
        EditableImage::new(AssetReference::new("img.png"), PixelSize::new(width, height))
            .with_pixels(Arc::new(pixels))
    }

    #[test]
    fn test_presets() {
        assert_eq!(ExportFormat::PRESETS.len(), 4);
        assert_eq!(ExportFormat::PRESETS[0].quality, 1.0);
        assert_eq!(ExportFormat::from_key("jpeg-medium"), Some(ExportFormat::JPEG_MEDIUM));
        assert_eq!(ExportFormat::from_key("tiff"), None);
    }

    #[test]
    fn test_parse_hex_colour() {
        assert_eq!(parse_hex_colour("#ff0000"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_hex_colour("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_hex_colour("white"), None);
    }

    #[test]
    fn test_render_places_scaled_image_on_background() {
        let mut scene = Scene::new(100, 100);
        let mut image = red_image(100, 50);
        image.placement = Placement::centered(50.0, 50.0, 0.5);
        scene.push(SceneObject::Image(image));
        scene.push(SceneObject::Text(TextObject::new("ignored", 0.0, 0.0)));

        let canvas = render(&scene).unwrap();
        assert_eq!(canvas.dimensions(), (100, 100));
        // 50x25 image centred at (50, 50) spans x 25..75, y 37..63
        assert_eq!(canvas.get_pixel(50, 50), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(50, 20), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_render_without_pixels_fails() {
        let mut scene = Scene::new(10, 10);
        scene.push(SceneObject::Image(EditableImage::new(
            AssetReference::new("img.png"),
            PixelSize::new(4, 4),
        )));
        assert!(matches!(render(&scene), Err(PipelineError::Export(_))));
    }

    #[test]
    fn test_export_restores_viewport() {
        let mut scene = Scene::new(20, 20);
        let zoomed = Viewport {
            transform: [2.0, 0.0, 0.0, 2.0, 5.0, 5.0],
            zoom: 2.0,
        };
        scene.set_viewport(zoomed);
        scene.push(SceneObject::Image(red_image(10, 10)));

        let exported = export(&mut scene, ExportFormat::PNG).unwrap();
        assert_eq!((exported.width, exported.height), (20, 20));
        assert_eq!(&exported.data[1..4], b"PNG");
        assert_eq!(scene.viewport(), zoomed);
    }

    #[test]
    fn test_export_restores_viewport_on_failure() {
        let mut scene = Scene::new(20, 20);
        let zoomed = Viewport {
            transform: [3.0, 0.0, 0.0, 3.0, 0.0, 0.0],
            zoom: 3.0,
        };
        scene.set_viewport(zoomed);
        scene.push(SceneObject::Image(EditableImage::new(
            AssetReference::new("img.png"),
            PixelSize::new(4, 4),
        )));

        assert!(export(&mut scene, ExportFormat::WEBP).is_err());
        assert_eq!(scene.viewport(), zoomed);
    }

    #[test]
    fn test_export_jpeg_and_webp() {
        let mut scene = Scene::new(16, 16);
        scene.push(SceneObject::Image(red_image(16, 16)));

        let jpeg = export(&mut scene, ExportFormat::JPEG_HIGH).unwrap();
        assert_eq!(&jpeg.data[..2], &[0xFF, 0xD8]);
        assert_eq!(jpeg.file_name("Beach"), "Beach.jpg");

        let webp = export(&mut scene, ExportFormat::WEBP).unwrap();
        assert_eq!(&webp.data[..4], b"RIFF");
    }

    #[test]
    fn test_crop_window_limits_rendered_area() {
        let mut scene = Scene::new(100, 100);
        let mut image = red_image(100, 100);
        image.crop = crate::scene::CropWindow {
            crop_x: 25.0,
            crop_y: 25.0,
            width: 50.0,
            height: 50.0,
        };
        scene.push(SceneObject::Image(image));

        let canvas = render(&scene).unwrap();
        assert_eq!(canvas.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(60, 60), &Rgba([255, 255, 255, 255]));
    }
}
