//! Image ingestion: one upload in, three renditions out.
//!
//! The pipeline persists the untouched payload into `images_full/`,
//! decodes it, and derives two downscaled JPEG renditions (small and
//! thumbnail) into their own subdirectories. Filenames are assigned per
//! rendition directory by probing the live directory listing — the store
//! does not track filenames, so the directory itself is the authority.
//!
//! Commit is all-or-nothing: the image record, the cover-image default,
//! the gallery timestamp, and the descriptor write either all land or
//! none do. Every failure path removes the files written so far, so a
//! rejected upload leaves no residue.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::imaging::{self, ImagingError};
use crate::store::{FULL_DIR, GalleryStore, SMALL_DIR, StoreError, THUMB_DIR};
use crate::types::{ImageRecord, ImageSizes};

/// Envelope bounding the small rendition.
pub const SMALL_BOUNDS: (u32, u32) = (1920, 1080);
/// Envelope bounding the thumbnail rendition.
pub const THUMB_BOUNDS: (u32, u32) = (400, 400);
/// Quality of re-encoded renditions.
pub const JPEG_QUALITY: u8 = 85;
/// Every stored rendition carries this extension, whatever was uploaded.
const OUTPUT_EXT: &str = "jpg";

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("image processing failed: {0}")]
    Imaging(#[from] ImagingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Find a free filename in `dir`, probing the live directory listing.
///
/// Candidates are `{base}{size}.{ext}`, then `{base}_001{size}.{ext}`,
/// `{base}_002{size}.{ext}`, … where `{size}` names the target envelope
/// (`__1920x1080`) for resized renditions and is absent for the full
/// one. Each counter value is distinct, so the probe terminates at the
/// first gap.
pub fn unique_filename(dir: &Path, base: &str, envelope: Option<(u32, u32)>, ext: &str) -> String {
    let size_suffix = envelope
        .map(|(w, h)| format!("__{w}x{h}"))
        .unwrap_or_default();

    let mut candidate = format!("{base}{size_suffix}.{ext}");
    let mut counter: u32 = 0;
    while dir.join(&candidate).exists() {
        counter += 1;
        candidate = format!("{base}_{counter:03}{size_suffix}.{ext}");
    }
    candidate
}

/// Ingest an uploaded image into a gallery.
///
/// Returns the committed [`ImageRecord`]; the gallery's descriptor has
/// been persisted (cover image defaulted, timestamp bumped) by the time
/// this returns. A payload that does not decode yields
/// [`IngestError::Imaging`] and no observable change.
pub fn ingest_image(
    store: &GalleryStore,
    gallery_id: &str,
    payload: &[u8],
    original_filename: &str,
) -> Result<ImageRecord, IngestError> {
    let mut gallery = store
        .get(gallery_id)
        .ok_or_else(|| StoreError::NotFound(gallery_id.to_string()))?;

    let base = filename_base(original_filename);
    let gallery_dir = store.gallery_dir(gallery_id);

    // The payload lands in images_full byte-for-byte before we even try
    // to decode it.
    let full_dir = gallery_dir.join(FULL_DIR);
    fs::create_dir_all(&full_dir)?;
    let full_name = unique_filename(&full_dir, &base, None, OUTPUT_EXT);
    fs::write(full_dir.join(&full_name), payload)?;

    let mut written = vec![full_dir.join(&full_name)];
    let (small_name, thumb_name, width, height) =
        match write_renditions(&gallery_dir, &base, payload, &mut written) {
            Ok(parts) => parts,
            Err(err) => {
                remove_files(&written);
                return Err(err);
            }
        };

    let record = ImageRecord {
        id: Uuid::new_v4().to_string(),
        filename: base,
        sizes: ImageSizes {
            full: format!("{FULL_DIR}/{full_name}"),
            small: format!("{SMALL_DIR}/{small_name}"),
            thumb: format!("{THUMB_DIR}/{thumb_name}"),
        },
        width: Some(width),
        height: Some(height),
    };

    gallery.images.push(record.clone());
    if gallery.cover_image_url.is_none() {
        gallery.cover_image_url = Some(record.sizes.thumb.clone());
    }
    gallery.touch();
    if let Err(err) = store.save_gallery(&gallery) {
        // The record never made it into the descriptor; take the files
        // back out so disk carries no trace of the aborted upload.
        remove_files(&written);
        return Err(err.into());
    }

    debug!("ingested image {} into gallery {gallery_id}", record.id);
    Ok(record)
}

/// Decode the payload and write the small and thumbnail renditions.
/// Paths are recorded in `written` before each write so a mid-write
/// failure still gets cleaned up by the caller.
fn write_renditions(
    gallery_dir: &Path,
    base: &str,
    payload: &[u8],
    written: &mut Vec<PathBuf>,
) -> Result<(String, String, u32, u32), IngestError> {
    let decoded = imaging::decode(payload)?;
    let (width, height) = (decoded.width(), decoded.height());

    let small = write_rendition(gallery_dir, SMALL_DIR, base, &decoded, SMALL_BOUNDS, written)?;
    let thumb = write_rendition(gallery_dir, THUMB_DIR, base, &decoded, THUMB_BOUNDS, written)?;
    Ok((small, thumb, width, height))
}

fn write_rendition(
    gallery_dir: &Path,
    subdir: &str,
    base: &str,
    decoded: &DynamicImage,
    bounds: (u32, u32),
    written: &mut Vec<PathBuf>,
) -> Result<String, IngestError> {
    let dir = gallery_dir.join(subdir);
    fs::create_dir_all(&dir)?;
    let name = unique_filename(&dir, base, Some(bounds), OUTPUT_EXT);
    let path = dir.join(&name);
    written.push(path.clone());

    let rendition = imaging::scale_to_fit(decoded, bounds);
    imaging::write_jpeg(&rendition, &path, JPEG_QUALITY)?;
    Ok(name)
}

/// Filename stem of the upload, falling back to `image` when the name
/// has no usable stem.
fn filename_base(original_filename: &str) -> String {
    let stem = Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .trim();
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem.to_string()
    }
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!("failed to clean up {}: {err}", path.display());
        }
    }
}
