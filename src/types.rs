//! Shared data model for galleries and their images.
//!
//! These types are the descriptor format: a [`Gallery`] serializes to the
//! `metadata.yaml` file at the root of its gallery directory, so field
//! names here are wire names (`lastUpdateDate`, `coverImageUrl`). Unset
//! optional fields are omitted on write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relative paths (rooted at the gallery directory) to the three fixed
/// renditions of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSizes {
    /// `images_full/...` — the original payload, byte-for-byte.
    pub full: String,
    /// `images_small/...` — bounded by 1920×1080.
    pub small: String,
    /// `images_thumb/...` — bounded by 400×400.
    pub thumb: String,
}

/// One uploaded image, owned by its parent [`Gallery`].
///
/// Images exist only inside a gallery's descriptor; they are never
/// persisted independently. Deleting the gallery deletes them all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Opaque, globally unique identifier (UUIDv4).
    pub id: String,
    /// Original filename stem, extension stripped.
    pub filename: String,
    pub sizes: ImageSizes,
    /// Native pixel width of the uploaded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Native pixel height of the uploaded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A named collection of images with its own directory and descriptor.
///
/// Identity is the `id` — immutable, filesystem-safe, unique at creation
/// (see [`crate::slug::generate_id`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: String,
    pub name: String,
    pub author: String,
    /// Bumped on every mutation; rendered as an ISO-8601 string on disk.
    #[serde(rename = "lastUpdateDate")]
    pub last_update_date: DateTime<Utc>,
    /// Rendition path of the cover image. Defaults to the thumbnail of
    /// the first uploaded image.
    #[serde(
        rename = "coverImageUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_image_url: Option<String>,
    /// Ordered: upload order is display order.
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl Gallery {
    /// Create an empty gallery stamped with the current time.
    pub fn new(id: impl Into<String>, name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author: author.into(),
            last_update_date: Utc::now(),
            cover_image_url: None,
            images: Vec::new(),
        }
    }

    /// Touch the last-update timestamp.
    pub fn touch(&mut self) {
        self.last_update_date = Utc::now();
    }
}

/// Listing projection of a gallery — everything a gallery index needs
/// without dragging the full image list along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GallerySummary {
    pub id: String,
    pub name: String,
    pub author: String,
    #[serde(rename = "coverImageUrl", skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

impl GallerySummary {
    pub fn from_gallery(gallery: &Gallery) -> Self {
        Self {
            id: gallery.id.clone(),
            name: gallery.name.clone(),
            author: gallery.author.clone(),
            cover_image_url: gallery.cover_image_url.clone(),
        }
    }
}
