// Thumbnail module
// Resamples images into fixed-size canvases and writes them back to disk

use crate::error::{Result, ThumbnailError};
use crate::geometry::Size;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits, RgbaImage};
use log::{debug, warn};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encoder quality, 1-100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub const DEFAULT: Quality = Quality(95);

    /// Out-of-range values fall back to [`Quality::DEFAULT`]
    pub fn new(value: i32) -> Self {
        if (1..=100).contains(&value) {
            Quality(value as u8)
        } else {
            Self::DEFAULT
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Resize `src` to exactly `dest_width` x `dest_height` and write it to `dest`
///
/// A zero width or height is derived from the other side using the source
/// aspect ratio. Once both sides are known the image is stretched to fill
/// them. `dest` may be the same file as `src`.
///
/// `quality` and `mime_type` are accepted for API compatibility, but the
/// encoder runs with its defaults; see [`generate_thumbnail_with_quality`].
pub fn generate_thumbnail(
    dest: impl AsRef<Path>,
    src: impl AsRef<Path>,
    dest_width: i32,
    dest_height: i32,
    quality: i32,
    mime_type: &str,
) -> Result<()> {
    generate(
        dest.as_ref(),
        src.as_ref(),
        dest_width,
        dest_height,
        Quality::new(quality),
        mime_type,
        false,
    )
}

/// Like [`generate_thumbnail`], but picks the encoder from `mime_type` and
/// applies `quality` to it
pub fn generate_thumbnail_with_quality(
    dest: impl AsRef<Path>,
    src: impl AsRef<Path>,
    dest_width: i32,
    dest_height: i32,
    quality: i32,
    mime_type: &str,
) -> Result<()> {
    generate(
        dest.as_ref(),
        src.as_ref(),
        dest_width,
        dest_height,
        Quality::new(quality),
        mime_type,
        true,
    )
}

fn generate(
    dest: &Path,
    src: &Path,
    dest_width: i32,
    dest_height: i32,
    quality: Quality,
    mime_type: &str,
    honor_quality: bool,
) -> Result<()> {
    if dest_width < 0 || dest_height < 0 {
        return Err(ThumbnailError::InvalidArgument(
            "target width and height must not be negative".to_string(),
        ));
    }
    if dest_width == 0 && dest_height == 0 {
        return Err(ThumbnailError::InvalidArgument(
            "target width and height must not both be zero".to_string(),
        ));
    }

    let source = decode(src)?;
    let target = resolve_size(
        Size::new(source.width(), source.height()),
        dest_width,
        dest_height,
    )?;
    check_canvas(target, source.color().bytes_per_pixel())?;
    debug!(
        "Thumbnailing {} ({}x{}) to {}",
        src.display(),
        source.width(),
        source.height(),
        target
    );

    let canvas = source.resize_exact(target.width, target.height, FilterType::CatmullRom);

    if is_same_file(dest, src) {
        drop(source);
    }

    if honor_quality {
        save_image_with_quality(dest, &canvas, quality, mime_type)
    } else {
        save_image_to_file(dest, &canvas, quality, mime_type)
    }
}

/// Fill in a zero side from the source aspect ratio
fn resolve_size(source: Size, dest_width: i32, dest_height: i32) -> Result<Size> {
    if source.is_empty() {
        return Err(ThumbnailError::InvalidArgument(format!(
            "source image has no pixels ({})",
            source
        )));
    }

    let ratio = source.height as f32 / source.width as f32;
    let mut width = dest_width as f32;
    let mut height = dest_height as f32;
    if dest_width == 0 {
        width = (height / ratio).round_ties_even();
    }
    if dest_height == 0 {
        height = (width * ratio).round_ties_even();
    }

    if width < 1.0 || height < 1.0 || width > u32::MAX as f32 || height > u32::MAX as f32 {
        return Err(ThumbnailError::InvalidArgument(format!(
            "derived target size {}x{} is unusable",
            width, height
        )));
    }
    Ok(Size::new(width as u32, height as u32))
}

/// Refuse canvases larger than the decoder's default allocation limit
fn check_canvas(size: Size, bytes_per_pixel: u8) -> Result<()> {
    let bytes = (size.width as u64)
        .checked_mul(size.height as u64)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel as u64));
    let limit = Limits::default().max_alloc.unwrap_or(u64::MAX);
    match bytes {
        Some(bytes) if bytes <= limit => Ok(()),
        _ => Err(ThumbnailError::InvalidArgument(format!(
            "target canvas {} exceeds the {} byte allocation limit",
            size, limit
        ))),
    }
}

/// Write `image` to `path`, choosing the format from the file extension
///
/// Extensions the `image` crate cannot encode are written as PNG. The parent directory must exist.
/// `quality` and `mime_type` do not reach the encoder.
pub fn save_image_to_file(
    path: impl AsRef<Path>,
    image: &DynamicImage,
    quality: Quality,
    mime_type: &str,
) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path)
        .ok()
        .filter(|format| format.writing_enabled())
        .unwrap_or(ImageFormat::Png);
    debug!(
        "Saving {} as {:?} (requested {} at quality {}, not applied)",
        path.display(),
        format,
        mime_type,
        quality.get()
    );

    encodable(image, format)
        .save_with_format(path, format)
        .map_err(encode_error)
}

/// Write `image` to `path` with the encoder registered for `mime_type`
///
/// JPEG output uses `quality`; other formats ignore it. Missing parent
/// directories are created.
pub fn save_image_with_quality(
    path: impl AsRef<Path>,
    image: &DynamicImage,
    quality: Quality,
    mime_type: &str,
) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_mime_type(mime_type).ok_or_else(|| {
        ThumbnailError::InvalidArgument(format!("no encoder for MIME type '{}'", mime_type))
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let image = encodable(image, format);
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality.get());
            image.write_with_encoder(encoder).map_err(encode_error)?;
        }
        other => {
            if quality != Quality::DEFAULT {
                warn!("Quality setting is ignored for {:?}", other);
            }
            image.write_to(&mut writer, other).map_err(encode_error)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Shrink `image` uniformly to fit `target` and draw it on a transparent
/// canvas of exactly that size
///
/// The scaled image is centered horizontally and sits on the bottom edge.
///
/// Fails with [`ThumbnailError::InvalidArgument`] when the canvas would be
/// too large to allocate.
pub fn scaled_thumbnail(image: &DynamicImage, target: Size) -> Result<DynamicImage> {
    check_canvas(target, 4)?;
    let mut canvas = RgbaImage::new(target.width, target.height);
    if target.is_empty() || image.width() == 0 || image.height() == 0 {
        return Ok(DynamicImage::ImageRgba8(canvas));
    }

    let ratio = (image.width() as f64 / target.width as f64)
        .max(image.height() as f64 / target.height as f64);
    let scaled_width = ((image.width() as f64 / ratio).ceil() as u32).clamp(1, target.width);
    let scaled_height = ((image.height() as f64 / ratio).ceil() as u32).clamp(1, target.height);

    let scaled = image
        .resize_exact(scaled_width, scaled_height, FilterType::CatmullRom)
        .to_rgba8();
    let x = (target.width - scaled_width) / 2;
    let y = target.height - scaled_height;
    imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);

    Ok(DynamicImage::ImageRgba8(canvas))
}

fn decode(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|err| match err {
            ImageError::IoError(io) => ThumbnailError::Io(io),
            other => ThumbnailError::Decode(other),
        })
}

fn encode_error(err: ImageError) -> ThumbnailError {
    match err {
        ImageError::IoError(io) => ThumbnailError::Io(io),
        other => ThumbnailError::Encode(other),
    }
}

/// JPEG has no alpha channel and only 8-bit samples
fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    match (format, image) {
        (ImageFormat::Jpeg, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) => {
            Cow::Borrowed(image)
        }
        (ImageFormat::Jpeg, _) => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        _ => Cow::Borrowed(image),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]))
            .save(&path)
            .unwrap();
        path
    }

    fn dimensions(path: &Path) -> (u32, u32) {
        image::image_dimensions(path).unwrap()
    }

    #[test]
    fn quality_falls_back_to_default() {
        assert_eq!(Quality::new(50).get(), 50);
        assert_eq!(Quality::new(0), Quality::DEFAULT);
        assert_eq!(Quality::new(101), Quality::DEFAULT);
        assert_eq!(Quality::default().get(), 95);
    }

    #[test]
    fn rejects_zero_by_zero() {
        let err = generate_thumbnail("out.png", "missing.png", 0, 0, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_negative_sizes() {
        let err = generate_thumbnail("out.png", "missing.png", -1, 100, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
        let err = generate_thumbnail("out.png", "missing.png", 100, -1, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
    }

    #[test]
    fn derives_width_from_height() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 200, 100);
        let dest = dir.path().join("thumb.png");

        generate_thumbnail(&dest, &src, 0, 50, 95, "image/png").unwrap();
        assert_eq!(dimensions(&dest), (100, 50));
    }

    #[test]
    fn derives_height_from_width() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 200, 100);
        let dest = dir.path().join("thumb.png");

        generate_thumbnail(&dest, &src, 30, 0, 95, "image/png").unwrap();
        assert_eq!(dimensions(&dest), (30, 15));
    }

    #[test]
    fn stretches_to_exact_size() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 200, 100);
        let dest = dir.path().join("thumb.jpg");

        generate_thumbnail(&dest, &src, 40, 40, 95, "image/jpeg").unwrap();
        assert_eq!(dimensions(&dest), (40, 40));
        assert_eq!(ImageFormat::from_path(&dest).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn overwrites_source_in_place() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "photo.png", 64, 32);

        generate_thumbnail(&src, &src, 16, 0, 95, "image/png").unwrap();
        assert_eq!(dimensions(&src), (16, 8));
    }

    #[test]
    fn unknown_extension_is_written_as_png() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 20, 20);
        let dest = dir.path().join("thumb.thumbnail");

        generate_thumbnail(&dest, &src, 10, 10, 95, "image/png").unwrap();
        let bytes = fs::read(&dest).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn extension_selects_any_supported_encoder() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 8, 8);
        let dest = dir.path().join("thumb.tga");

        generate_thumbnail(&dest, &src, 2, 2, 95, "image/png").unwrap();
        let bytes = fs::read(&dest).unwrap();
        assert_ne!(image::guess_format(&bytes).ok(), Some(ImageFormat::Png));
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Tga).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }

    #[test]
    fn oversized_canvas_is_rejected() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 4, 4);
        let dest = dir.path().join("huge.png");

        let err = generate_thumbnail(&dest, &src, i32::MAX, i32::MAX, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
        assert!(!dest.exists());

        // Derived side pushes the canvas over the limit too.
        let err = generate_thumbnail(&dest, &src, 0, 1_000_000, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
    }

    #[test]
    fn scaled_thumbnail_rejects_oversized_canvas() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let err = scaled_thumbnail(&image, Size::new(u32::MAX, u32::MAX)).unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
    }

    #[test]
    fn alpha_source_to_jpeg() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("alpha.png");
        RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 100]))
            .save(&src)
            .unwrap();
        let dest = dir.path().join("thumb.jpeg");

        generate_thumbnail(&dest, &src, 5, 5, 95, "image/jpeg").unwrap();
        assert_eq!(dimensions(&dest), (5, 5));
    }

    #[test]
    fn missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = generate_thumbnail(
            dir.path().join("out.png"),
            dir.path().join("nope.png"),
            10,
            10,
            95,
            "image/png",
        )
        .unwrap_err();
        assert!(matches!(err, ThumbnailError::Io(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn corrupt_source_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("broken.png");
        fs::write(&src, b"definitely not an image file").unwrap();

        let err =
            generate_thumbnail(dir.path().join("out.png"), &src, 10, 10, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::Decode(_)));
    }

    #[test]
    fn derived_side_of_zero_is_rejected() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "tall.png", 10, 1000);

        let err =
            generate_thumbnail(dir.path().join("out.png"), &src, 0, 1, 95, "image/png").unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
    }

    #[test]
    fn missing_destination_directory_fails_without_quality_path() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 20, 20);
        let dest = dir.path().join("nested").join("thumb.png");

        assert!(generate_thumbnail(&dest, &src, 10, 10, 95, "image/png").is_err());

        generate_thumbnail_with_quality(&dest, &src, 10, 10, 95, "image/png").unwrap();
        assert_eq!(dimensions(&dest), (10, 10));
    }

    #[test]
    fn quality_path_applies_jpeg_quality() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("noise.png");
        RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x ^ y) * 13 % 256) as u8])
        })
        .save(&src)
        .unwrap();
        let low = dir.path().join("low.jpg");
        let high = dir.path().join("high.jpg");

        generate_thumbnail_with_quality(&low, &src, 64, 64, 5, "image/jpeg").unwrap();
        generate_thumbnail_with_quality(&high, &src, 64, 64, 100, "image/jpeg").unwrap();
        let low_len = fs::metadata(&low).unwrap().len();
        let high_len = fs::metadata(&high).unwrap().len();
        assert!(low_len < high_len, "{} >= {}", low_len, high_len);
    }

    #[test]
    fn quality_path_rejects_unknown_mime() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "src.png", 20, 20);
        let err = generate_thumbnail_with_quality(
            dir.path().join("out.bin"),
            &src,
            10,
            10,
            95,
            "application/x-nothing",
        )
        .unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidArgument(_)));
    }

    #[test]
    fn scaled_thumbnail_is_bottom_anchored() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([255, 0, 0])));
        let thumb = scaled_thumbnail(&image, Size::new(50, 50)).unwrap().to_rgba8();

        assert_eq!(thumb.dimensions(), (50, 50));
        // Top half is empty canvas, bottom half holds the 50x25 image.
        assert_eq!(thumb.get_pixel(25, 10)[3], 0);
        assert_eq!(thumb.get_pixel(25, 40)[3], 255);
        assert_eq!(thumb.get_pixel(25, 24)[3], 0);
        assert_eq!(thumb.get_pixel(25, 25)[3], 255);
    }

    #[test]
    fn scaled_thumbnail_centers_horizontally() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 200, Rgb([0, 255, 0])));
        let thumb = scaled_thumbnail(&image, Size::new(50, 50)).unwrap().to_rgba8();

        // 25x50 drawn at x = 12
        assert_eq!(thumb.get_pixel(11, 25)[3], 0);
        assert_eq!(thumb.get_pixel(12, 25)[3], 255);
        assert_eq!(thumb.get_pixel(36, 25)[3], 255);
        assert_eq!(thumb.get_pixel(37, 25)[3], 0);
    }

    #[test]
    fn scaled_thumbnail_of_empty_target() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let thumb = scaled_thumbnail(&image, Size::new(0, 20)).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (0, 20));
    }
}
