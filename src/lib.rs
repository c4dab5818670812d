//! # Gallerist
//!
//! A filesystem-backed store for image galleries. Your filesystem is the
//! database: each gallery is a directory holding a `metadata.yaml`
//! descriptor and three rendition subdirectories, and the store keeps an
//! in-memory cache reconciled against disk by descriptor modification
//! time.
//!
//! # Architecture
//!
//! ```text
//! galleries/
//! └── zustrich-2024/
//!     ├── metadata.yaml          ← descriptor (source of truth on disk)
//!     ├── images_full/           ← uploads, byte-for-byte
//!     ├── images_small/          ← ≤ 1920×1080, JPEG q85
//!     ├── images_thumb/          ← ≤ 400×400, JPEG q85
//!     ├── images/                ← untouched originals for archival
//!     └── zustrich-2024.zip      ← on-demand snapshot
//! ```
//!
//! Four components cover the moving parts:
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | in-memory gallery cache with mtime-based invalidation; the only mutation surface (`refresh`, `save_gallery`, `create_gallery`, `purge_gallery`, …) |
//! | [`slug`] | human-readable, filesystem-safe gallery identifiers with transliteration and collision resolution |
//! | [`ingest`] | upload pipeline: collision-safe filenames, three renditions, all-or-nothing commit |
//! | [`archive`] | background zip snapshots with at-most-one-build-per-gallery semantics |
//! | [`imaging`] | decode, envelope-fit scaling, JPEG encoding |
//! | [`types`] | descriptor data model shared by everything above |
//! | [`config`] | root directory and identifier length settings |
//!
//! The HTTP layer, authentication, and static-file serving are external
//! collaborators: they map requests onto the four component contracts
//! and serve rendition files straight from the gallery tree.
//!
//! # Design Decisions
//!
//! ## Filesystem as Database
//!
//! Galleries are plain directories, descriptors are plain YAML. Anything
//! — a shell script, rsync, a human with an editor — can produce or
//! repair a gallery, and [`store::GalleryStore::refresh`] will pick it
//! up. The cost is an explicit staleness rule: a descriptor is re-read
//! only when its mtime strictly exceeds the last observed value, and a
//! cached entry whose descriptor vanished is evicted.
//!
//! ## One Mutex, Two Maps
//!
//! The gallery map and the mtime map describe the same cache and must
//! move together, so both live behind a single mutex inside the store.
//! Mutation methods are atomic units; there are no free functions
//! touching shared globals.
//!
//! ## Renditions Are Derived, Never Authoritative
//!
//! The store tracks rendition *paths*, not files. Filename assignment
//! probes the live directory at write time, which keeps the cache out of
//! the business of mirroring directory listings.
//!
//! ## Best-Effort Build Guard
//!
//! The archive task's "building" marker is process memory only. The
//! durable marker is the completed zip, finalized by an atomic rename —
//! a crash mid-build leaves nothing visible and the next request starts
//! clean.

pub mod archive;
pub mod config;
pub mod imaging;
pub mod ingest;
pub mod slug;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
