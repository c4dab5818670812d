//! Background zip snapshots of a gallery's original images.
//!
//! A snapshot is `{gallery_dir}/{gallery_id}.zip`, built from the
//! regular files directly under the gallery's `images/` subtree. The
//! state machine per gallery id is `absent → building → absent|ready`:
//!
//! - **ready** is detected by the completed zip existing on disk — the
//!   only durable marker. Builds write to a `.partial` file and rename
//!   into place, so a half-written zip is never observable under the
//!   final name, and a crash mid-build simply restarts from scratch.
//! - **building** lives only in process memory: a guard set of gallery
//!   ids that keeps at most one build per id in flight. The marker is
//!   cleared on drop, success or failure, so it can never stick.
//!
//! Builds run on detached threads; callers poll by re-requesting.
//! Distinct gallery ids build concurrently. Originals with identical
//! content are archived once.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::store::ORIGINALS_DIR;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("gallery directory does not exist: {0}")]
    MissingGallery(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Outcome of an archive request.
#[derive(Debug)]
pub enum ArchiveStatus {
    /// A completed snapshot exists at this path.
    Ready(PathBuf),
    /// A build for this gallery is already in flight; ask again later.
    InProgress,
    /// A build was started in the background; ask again later.
    Started,
}

/// Hands out gallery snapshots and owns the in-flight guard set.
///
/// Cloning shares the guard set, so every clone enforces the same
/// one-build-per-gallery rule.
#[derive(Clone, Default)]
pub struct Archiver {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Archiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the finished snapshot, report a build in flight, or start
    /// one on a detached thread.
    pub fn request(&self, root: &Path, gallery_id: &str) -> Result<ArchiveStatus, ArchiveError> {
        let gallery_dir = root.join(gallery_id);
        if !gallery_dir.is_dir() {
            return Err(ArchiveError::MissingGallery(gallery_dir));
        }

        let zip_path = gallery_dir.join(format!("{gallery_id}.zip"));
        if zip_path.exists() {
            return Ok(ArchiveStatus::Ready(zip_path));
        }

        let Some(guard) = BuildGuard::acquire(&self.in_flight, gallery_id) else {
            return Ok(ArchiveStatus::InProgress);
        };

        let id = gallery_id.to_string();
        thread::spawn(move || {
            let _guard = guard;
            match build_gallery_zip(&gallery_dir, &zip_path) {
                Ok(count) => info!("archived {count} originals for gallery {id}"),
                Err(err) => warn!("archive build for gallery {id} failed: {err}"),
            }
        });
        Ok(ArchiveStatus::Started)
    }
}

/// Marks a gallery id as building. The marker is removed on drop, so
/// neither a build error nor a panic can leave the id stuck.
struct BuildGuard {
    set: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl BuildGuard {
    /// `None` when a build for this id is already marked in flight.
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, id: &str) -> Option<Self> {
        let mut ids = set.lock().expect("archive guard mutex poisoned");
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            id: id.to_string(),
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.set.lock() {
            ids.remove(&self.id);
        }
    }
}

/// Build the snapshot synchronously: deflate every unique regular file
/// directly under `images/` into a `.partial` file, then rename it into
/// place. Returns the number of files archived.
///
/// A missing or empty `images/` subtree yields a valid empty zip.
pub fn build_gallery_zip(gallery_dir: &Path, zip_path: &Path) -> Result<usize, ArchiveError> {
    let originals = gallery_dir.join(ORIGINALS_DIR);
    let partial = zip_path.with_extension("zip.partial");

    let finished = write_zip(&originals, &partial).and_then(|count| {
        fs::rename(&partial, zip_path)?;
        Ok(count)
    });
    if finished.is_err() {
        let _ = fs::remove_file(&partial);
    }
    finished
}

fn write_zip(originals: &Path, partial: &Path) -> Result<usize, ArchiveError> {
    let file = File::create(partial)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    let mut count = 0;

    if originals.is_dir() {
        for entry in WalkDir::new(originals)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let bytes = fs::read(entry.path())?;
            let digest: [u8; 32] = Sha256::digest(&bytes).into();
            if !seen.insert(digest) {
                debug!("skipping duplicate original {name}");
                continue;
            }
            zip.start_file(name, options)?;
            io::Write::write_all(&mut zip, &bytes)?;
            count += 1;
        }
    }

    zip.finish()?;
    Ok(count)
}
