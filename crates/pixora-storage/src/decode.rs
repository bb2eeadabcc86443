//! Image decoding shared by all backends

use image::{GenericImageView, ImageReader};
use pixora_core::AssetReference;
use std::io::Cursor;
use std::sync::Arc;

use crate::traits::{FetchedImage, StorageError, StorageResult};

/// Decode fetched bytes into an image with its intrinsic dimensions
pub fn decode_image(reference: &AssetReference, data: &[u8]) -> StorageResult<FetchedImage> {
    let cursor = Cursor::new(data);
    let reader = ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| StorageError::DecodeFailed(format!("{}: {}", reference, e)))?;
    let img = reader
        .decode()
        .map_err(|e| StorageError::DecodeFailed(format!("{}: {}", reference, e)))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(StorageError::DecodeFailed(format!(
            "{}: image has no pixels",
            reference
        )));
    }

    Ok(FetchedImage {
        reference: reference.clone(),
        image: Arc::new(img),
        width,
        height,
    })
}

/// Dimensions of an encoded image, if it decodes
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let cursor = Cursor::new(data);
    let reader = ImageReader::new(cursor).with_guessed_format().ok()?;
    reader.into_dimensions().ok()
}
