// Image loading module
// Decodes images from files or raw bytes for the viewer and the thumbnailer

use anyhow::{Context, Result};
use image::DynamicImage;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

/// Where an image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on disk
    Path(PathBuf),
    /// Encoded bytes, e.g. piped through stdin
    Bytes(Vec<u8>),
}

/// Load and decode an image from the given source
pub fn load_image(source: &ImageSource) -> Result<DynamicImage> {
    match source {
        ImageSource::Path(path) => {
            let data = fs::read(path)
                .with_context(|| format!("Failed to read image file: {}", path.display()))?;
            load_from_bytes(&data)
        }
        ImageSource::Bytes(data) => load_from_bytes(data),
    }
}

/// Load an image from raw bytes, auto-detecting the format
pub fn load_from_bytes(data: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(data).context("Failed to detect image format")?;

    let cursor = Cursor::new(data);
    let img = image::load(cursor, format).context("Failed to decode image")?;

    Ok(img)
}
