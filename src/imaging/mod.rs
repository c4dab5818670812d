//! Image decoding, scaling, and JPEG encoding — pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | **Fit math** | [`fit_within`] (pure, no I/O) |
//! | **Resize** | `DynamicImage::resize_exact` with `Lanczos3` |
//! | **Encode** | `JpegEncoder::new_with_quality` |
//!
//! All renditions are JPEG: universally decodable, and a fixed moderate
//! quality keeps small/thumb files predictable in size. The full-size
//! rendition is the uploaded payload written untouched, so these
//! operations only ever produce the two downscaled variants.

mod calculations;

pub use calculations::fit_within;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a decodable image: {0}")]
    Decode(image::ImageError),
    #[error("JPEG encoding failed: {0}")]
    Encode(image::ImageError),
}

/// Decode an uploaded payload into pixels.
///
/// Format is sniffed from the bytes, not the filename, so a mislabeled
/// upload still decodes (or fails honestly).
pub fn decode(payload: &[u8]) -> Result<DynamicImage, ImagingError> {
    image::load_from_memory(payload).map_err(ImagingError::Decode)
}

/// Scale an image to fit inside `bounds`, preserving aspect ratio.
///
/// Images already inside the envelope are returned as-is — renditions
/// never upscale past the original.
pub fn scale_to_fit(image: &DynamicImage, bounds: (u32, u32)) -> DynamicImage {
    let target = fit_within((image.width(), image.height()), bounds);
    if target == (image.width(), image.height()) {
        image.clone()
    } else {
        image.resize_exact(target.0, target.1, FilterType::Lanczos3)
    }
}

/// Encode an image as JPEG at the given quality.
///
/// The image is flattened to RGB8 first; JPEG has no alpha channel, and
/// the encoder rejects RGBA buffers outright.
pub fn write_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), ImagingError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(ImagingError::Encode)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_payload;
    use tempfile::TempDir;

    #[test]
    fn decode_valid_png() {
        let img = decode(&png_payload(320, 240)).unwrap();
        assert_eq!((img.width(), img.height()), (320, 240));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = decode(b"definitely not an image");
        assert!(matches!(result, Err(ImagingError::Decode(_))));
    }

    #[test]
    fn scale_to_fit_downscales() {
        let img = decode(&png_payload(800, 600)).unwrap();
        let scaled = scale_to_fit(&img, (400, 400));
        assert_eq!((scaled.width(), scaled.height()), (400, 300));
    }

    #[test]
    fn scale_to_fit_leaves_small_images_alone() {
        let img = decode(&png_payload(200, 150)).unwrap();
        let scaled = scale_to_fit(&img, (400, 400));
        assert_eq!((scaled.width(), scaled.height()), (200, 150));
    }

    #[test]
    fn write_jpeg_produces_decodable_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");
        let img = decode(&png_payload(640, 480)).unwrap();

        write_jpeg(&img, &path, 85).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (640, 480));
    }

    #[test]
    fn write_jpeg_flattens_alpha() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alpha.jpg");
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            64,
            64,
            image::Rgba([200, 100, 50, 128]),
        ));

        write_jpeg(&rgba, &path, 85).unwrap();
        assert!(image::open(&path).is_ok());
    }
}
