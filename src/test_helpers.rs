//! Shared test utilities for the gallerist test suite.
//!
//! Provides a temp-rooted store builder, descriptor writers, and
//! synthetic image payloads so tests never depend on fixture files.

use std::fs;
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::config::StoreConfig;
use crate::store::{FULL_DIR, GalleryStore, METADATA_FILENAME, SMALL_DIR, THUMB_DIR};
use crate::types::{Gallery, ImageRecord, ImageSizes};

/// Open a store rooted at `root` with default settings.
pub fn open_store(root: &Path) -> GalleryStore {
    let config = StoreConfig {
        root_dir: root.to_path_buf(),
        ..StoreConfig::default()
    };
    GalleryStore::open(&config).unwrap()
}

/// Serialize a gallery straight to its descriptor file, bypassing the
/// store — for simulating pre-existing or externally written galleries.
pub fn write_descriptor(root: &Path, gallery: &Gallery) {
    let dir = root.join(&gallery.id);
    fs::create_dir_all(&dir).unwrap();
    let yaml = serde_yaml::to_string(gallery).unwrap();
    fs::write(dir.join(METADATA_FILENAME), yaml).unwrap();
}

/// In-memory PNG payload with a gradient, so downscaling and JPEG
/// encoding operate on real pixel variation.
pub fn png_payload(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
    }));
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    bytes
}

/// Write three placeholder rendition files for `stem` under
/// `gallery_dir` and return the matching record.
pub fn sample_image_record(gallery_dir: &Path, stem: &str) -> ImageRecord {
    let sizes = ImageSizes {
        full: format!("{FULL_DIR}/{stem}.jpg"),
        small: format!("{SMALL_DIR}/{stem}__1920x1080.jpg"),
        thumb: format!("{THUMB_DIR}/{stem}__400x400.jpg"),
    };
    for rel in [&sizes.full, &sizes.small, &sizes.thumb] {
        let path = gallery_dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"fake image bytes").unwrap();
    }
    ImageRecord {
        id: format!("img-{stem}"),
        filename: stem.to_string(),
        sizes,
        width: Some(800),
        height: Some(600),
    }
}
