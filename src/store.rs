//! Filesystem-backed gallery store with mtime-based cache invalidation.
//!
//! The filesystem is the database: each gallery is a directory under the
//! store root, described by a `metadata.yaml` descriptor. The store keeps
//! every gallery in memory and reconciles against disk by comparing the
//! descriptor's modification time with the last one observed — a
//! descriptor is re-read only when its mtime strictly exceeds the cached
//! value.
//!
//! # Consistency rules
//!
//! - [`refresh`](GalleryStore::refresh) is idempotent: with no filesystem
//!   change between calls, the second pass re-parses nothing and the
//!   cache is unchanged.
//! - A descriptor that fails to parse is logged and skipped; a prior good
//!   cache entry for that id is never evicted by a parse failure.
//! - A cached id whose descriptor vanished from disk is evicted.
//! - [`save_gallery`](GalleryStore::save_gallery) updates the cache from
//!   the just-written file, so the cache never lags behind a successful
//!   write made through the store.
//!
//! Both cache maps live behind one mutex and mutate as a unit, so
//! concurrent refreshes and saves cannot interleave per-map.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::slug::generate_id;
use crate::types::{Gallery, GallerySummary};

/// Descriptor filename within each gallery directory.
pub const METADATA_FILENAME: &str = "metadata.yaml";

/// Rendition subdirectory holding the untouched uploaded payloads.
pub const FULL_DIR: &str = "images_full";
/// Rendition subdirectory bounded by 1920×1080.
pub const SMALL_DIR: &str = "images_small";
/// Rendition subdirectory bounded by 400×400.
pub const THUMB_DIR: &str = "images_thumb";
/// Subtree of originals snapshotted by the archival task.
pub const ORIGINALS_DIR: &str = "images";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("gallery not found: {0}")]
    NotFound(String),
    #[error("gallery directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("descriptor error: {0}")]
    Descriptor(#[from] serde_yaml::Error),
}

/// Cache maps guarded as one unit: an id present in `galleries` is
/// present in `mtimes` and vice versa.
#[derive(Default)]
struct StoreState {
    galleries: HashMap<String, Gallery>,
    mtimes: HashMap<String, SystemTime>,
}

/// Process-wide gallery store. See the [module docs](self) for the
/// consistency rules.
pub struct GalleryStore {
    root: PathBuf,
    max_id_length: usize,
    state: Mutex<StoreState>,
}

impl GalleryStore {
    /// Open the store: create the root directory if needed and run the
    /// initial filesystem scan.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.root_dir)?;
        let store = Self {
            root: config.root_dir.clone(),
            max_id_length: config.max_id_length,
            state: Mutex::new(StoreState::default()),
        };
        store.refresh()?;
        Ok(store)
    }

    /// Root directory holding one subdirectory per gallery.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a gallery (existing or not).
    pub fn gallery_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("gallery store mutex poisoned")
    }

    /// Reconcile the cache against the directory tree.
    ///
    /// Holds the store lock for the whole pass so concurrent refreshes
    /// serialize; descriptor parsing of changed entries fans out to
    /// rayon workers.
    pub fn refresh(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Vec<(String, PathBuf, SystemTime)> = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(String::from) else {
                continue; // non-UTF-8 names cannot be gallery ids
            };
            let descriptor = entry.path().join(METADATA_FILENAME);
            let Ok(meta) = fs::metadata(&descriptor) else {
                continue; // a directory without a descriptor is not a gallery
            };
            let mtime = meta.modified()?;
            seen.insert(id.clone());
            if state.mtimes.get(&id).is_none_or(|cached| mtime > *cached) {
                pending.push((id, descriptor, mtime));
            }
        }

        let parsed: Vec<_> = pending
            .into_par_iter()
            .map(|(id, path, mtime)| {
                let result = load_descriptor(&path);
                (id, path, mtime, result)
            })
            .collect();

        for (id, path, mtime, result) in parsed {
            match result {
                Ok(gallery) if gallery.id == id => {
                    state.galleries.insert(id.clone(), gallery);
                    state.mtimes.insert(id, mtime);
                }
                Ok(gallery) => {
                    // Descriptor claims a different id than its directory.
                    // Treat like a parse failure: keep any prior entry.
                    warn!(
                        "descriptor {} declares id {:?}, directory is {:?}; skipping",
                        path.display(),
                        gallery.id,
                        id
                    );
                }
                Err(err) => {
                    warn!("skipping unreadable descriptor {}: {err}", path.display());
                }
            }
        }

        state.galleries.retain(|id, _| seen.contains(id));
        state.mtimes.retain(|id, _| seen.contains(id));
        Ok(())
    }

    /// Fetch a gallery by id from the cache.
    pub fn get(&self, id: &str) -> Option<Gallery> {
        self.state().galleries.get(id).cloned()
    }

    /// Listing projections of all cached galleries, sorted by id.
    pub fn list(&self) -> Vec<GallerySummary> {
        let state = self.state();
        let mut summaries: Vec<GallerySummary> = state
            .galleries
            .values()
            .map(GallerySummary::from_gallery)
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Create a gallery: derive a unique id, lay out the directory
    /// skeleton, and persist the descriptor.
    ///
    /// Losing the create race (another writer claimed the freshly
    /// generated directory first) is retried once with a salted name,
    /// as a second collision through two filesystem probes is not a
    /// race anymore but an IO problem worth surfacing.
    pub fn create_gallery(&self, name: &str, author: &str) -> Result<Gallery, StoreError> {
        let existing: HashSet<String> = self.state().galleries.keys().cloned().collect();

        let id = generate_id(name, &existing, &self.root, self.max_id_length);
        let id = match create_skeleton(&self.root.join(&id)) {
            Ok(()) => id,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let salt = Uuid::new_v4().simple().to_string();
                let salted = format!("{name}-{}", &salt[..4]);
                let id = generate_id(&salted, &existing, &self.root, self.max_id_length);
                create_skeleton(&self.root.join(&id))?;
                id
            }
            Err(err) => return Err(err.into()),
        };

        let gallery = Gallery::new(id, name, author);
        self.save_gallery(&gallery)?;
        info!("created gallery {}", gallery.id);
        Ok(gallery)
    }

    /// Replace a gallery's name and author, bump its timestamp, and
    /// persist.
    pub fn update_gallery(
        &self,
        id: &str,
        name: &str,
        author: &str,
    ) -> Result<Gallery, StoreError> {
        let mut gallery = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        gallery.name = name.to_string();
        gallery.author = author.to_string();
        gallery.touch();
        self.save_gallery(&gallery)?;
        Ok(gallery)
    }

    /// Serialize a gallery to its descriptor and update the cache from
    /// the just-written file's mtime.
    pub fn save_gallery(&self, gallery: &Gallery) -> Result<(), StoreError> {
        let dir = self.gallery_dir(&gallery.id);
        fs::create_dir_all(&dir)?;

        let descriptor = dir.join(METADATA_FILENAME);
        let yaml = serde_yaml::to_string(gallery)?;
        fs::write(&descriptor, yaml)?;
        let mtime = fs::metadata(&descriptor)?.modified()?;

        let mut state = self.state();
        state.galleries.insert(gallery.id.clone(), gallery.clone());
        state.mtimes.insert(gallery.id.clone(), mtime);
        Ok(())
    }

    /// Remove an image's three rendition files and drop it from the
    /// gallery's in-memory list. Returns `Ok(false)` when the id is not
    /// in the list.
    ///
    /// The caller persists the updated gallery; the list is only mutated
    /// once all three files are gone. A rendition already missing from
    /// disk is a data-integrity problem and surfaces as the underlying
    /// IO error.
    pub fn delete_gallery_image(
        &self,
        gallery: &mut Gallery,
        image_id: &str,
    ) -> Result<bool, StoreError> {
        let Some(index) = gallery.images.iter().position(|img| img.id == image_id) else {
            return Ok(false);
        };

        let dir = self.gallery_dir(&gallery.id);
        let sizes = &gallery.images[index].sizes;
        for rendition in [&sizes.full, &sizes.small, &sizes.thumb] {
            fs::remove_file(dir.join(rendition))?;
        }

        gallery.images.remove(index);
        Ok(true)
    }

    /// Remove a gallery's entire directory tree and evict it from the
    /// cache. Errors when the directory is already gone — callers are
    /// expected to check existence first.
    pub fn purge_gallery(&self, id: &str) -> Result<(), StoreError> {
        let dir = self.gallery_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::MissingDirectory(dir));
        }
        fs::remove_dir_all(&dir)?;

        let mut state = self.state();
        state.galleries.remove(id);
        state.mtimes.remove(id);
        info!("purged gallery {id}");
        Ok(())
    }
}

fn load_descriptor(path: &Path) -> Result<Gallery, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Create the gallery directory itself (failing if it already exists)
/// plus its fixed subdirectories.
fn create_skeleton(dir: &Path) -> io::Result<()> {
    fs::create_dir(dir)?;
    for sub in [FULL_DIR, SMALL_DIR, THUMB_DIR, ORIGINALS_DIR] {
        fs::create_dir_all(dir.join(sub))?;
    }
    Ok(())
}
