//! Directory scanning logic

mod walker;

pub use walker::{
    discover_roots, ensure_tracks, list_subdirs, scan_root, ProgressCallback,
};
