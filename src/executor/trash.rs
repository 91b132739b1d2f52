//! Trash-based delete operations
//!
//! Propagated deletes move copies under
//! `<root>/.setupsync_trash/<timestamp>/<track>/<setup>`. A manifest is
//! updated for recovery.

use crate::executor::copy::copy_file_atomic;
use crate::types::{map_io_error, SyncError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the trash directory inside a root
pub const TRASH_DIR: &str = ".setupsync_trash";

/// Represents a single deleted setup in the trash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedFile {
    /// `<track>/<setup>` relative to the root
    pub original_path: String,
    /// Relative path inside the snapshot directory
    pub trash_path: String,
    /// RFC 3339 timestamp when the setup was deleted
    pub deleted_at: String,
    /// File size in bytes
    pub size: u64,
}

/// Manifest file that tracks all deleted setups in a trash snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrashManifest {
    pub files: Vec<DeletedFile>,
}

impl TrashManifest {
    /// Add a deleted file entry to the manifest
    pub fn add_file(&mut self, file: DeletedFile) {
        self.files.push(file);
    }
}

/// Move a setup copy to the root's trash instead of deleting it
///
/// Setups trashed within the same second share one snapshot directory.
/// `target_path` must be `<root>/<track>/<setup>`. Returns the trash location.
///
/// # Example
/// ```no_run
/// use setupsync::executor::trash::move_to_trash;
/// use std::path::Path;
///
/// move_to_trash(Path::new("/setups/Spa/Race1__sync-Monza.json"))?;
/// # Ok::<(), setupsync::types::SyncError>(())
/// ```
pub fn move_to_trash(target_path: &Path) -> Result<PathBuf, SyncError> {
    let (root, relative_path) = split_setup_path(target_path)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H%M%S").to_string();
    let trash_root = root.join(TRASH_DIR).join(&timestamp);
    let trash_file_path = trash_root.join(&relative_path);

    if let Some(parent) = trash_file_path.parent() {
        fs::create_dir_all(parent).map_err(|e| map_io_error(parent, e))?;
    }

    let size = fs::metadata(target_path)
        .map_err(|e| map_io_error(target_path, e))?
        .len();

    match fs::rename(target_path, &trash_file_path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            copy_file_atomic(target_path, &trash_file_path)?;
            fs::remove_file(target_path).map_err(|e| map_io_error(target_path, e))?;
        }
        Err(e) => return Err(map_io_error(target_path, e)),
    }

    let manifest_path = trash_root.join("MANIFEST.json");

    // Manifest writes use a read-modify-write flow and are not transactional.
    let mut manifest: TrashManifest = if manifest_path.exists() {
        let manifest_content =
            fs::read_to_string(&manifest_path).map_err(|e| map_io_error(&manifest_path, e))?;
        serde_json::from_str(&manifest_content)
            .map_err(|e| SyncError::Validation(format!("Failed to parse MANIFEST.json: {}", e)))?
    } else {
        TrashManifest::default()
    };

    let relative = relative_path.to_string_lossy().to_string();
    manifest.add_file(DeletedFile {
        original_path: relative.clone(),
        trash_path: relative,
        deleted_at: Local::now().to_rfc3339(),
        size,
    });

    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| SyncError::Validation(format!("Failed to serialize MANIFEST.json: {}", e)))?;
    fs::write(&manifest_path, manifest_json).map_err(|e| map_io_error(&manifest_path, e))?;

    Ok(trash_file_path)
}

/// Split `<root>/<track>/<setup>` into the root and `<track>/<setup>`
fn split_setup_path(path: &Path) -> Result<(PathBuf, PathBuf), SyncError> {
    let invalid = || SyncError::Validation(format!("Not a setup path: {}", path.display()));

    let name = path.file_name().ok_or_else(invalid)?;
    let track_dir = path.parent().ok_or_else(invalid)?;
    let track = track_dir.file_name().ok_or_else(invalid)?;
    let root = track_dir.parent().ok_or_else(invalid)?;

    Ok((root.to_path_buf(), Path::new(track).join(name)))
}
