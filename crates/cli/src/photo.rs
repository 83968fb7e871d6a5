//! Logsheet photo loading.
//!
//! Phone photos are usually stored sideways with an EXIF orientation tag.
//! Applying that tag is the only preprocessing; the result is re-encoded as
//! PNG so every provider receives the same upright pixels.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use thiserror::Error;
use tracing::debug;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("unsupported image type '{0}' (expected jpg, jpeg, png, webp or gif)")]
    Unsupported(String),
    #[error("cannot read image '{}': {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot decode image '{}': {source}", .path.display())]
    Decode { path: PathBuf, source: image::ImageError },
    #[error("cannot re-encode image: {0}")]
    Encode(image::ImageError),
}

/// Upright image bytes ready for upload.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl ImagePayload {
    /// Wrap already-encoded PNG bytes.
    pub fn png(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self { bytes, mime_type: "image/png", width, height }
    }
}

pub fn load(path: &Path) -> Result<ImagePayload, PhotoError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(PhotoError::Unsupported(path.display().to_string()));
    }

    let decode_err = |source: image::ImageError| PhotoError::Decode { path: path.to_path_buf(), source };

    let reader = ImageReader::open(path)
        .map_err(|source| PhotoError::Read { path: path.to_path_buf(), source })?
        .with_guessed_format()
        .map_err(|source| PhotoError::Read { path: path.to_path_buf(), source })?;
    let mut decoder = reader.into_decoder().map_err(decode_err)?;
    let orientation = decoder.orientation().map_err(decode_err)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    img.apply_orientation(orientation);

    let payload = encode_png(&img)?;
    debug!(
        path = %path.display(),
        ?orientation,
        width = payload.width,
        height = payload.height,
        bytes = payload.bytes.len(),
        "loaded image"
    );
    Ok(payload)
}

fn encode_png(img: &DynamicImage) -> Result<ImagePayload, PhotoError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).map_err(PhotoError::Encode)?;
    Ok(ImagePayload::png(bytes, img.width(), img.height()))
}
