//! Track and setup discovery

use crate::config::{Config, Layout};
use crate::naming::is_ignored_name;
use crate::types::{map_io_error, SetupFile, SyncError, SyncRoot};
use globset::GlobSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// Callback for reporting scan progress
///
/// Arguments:
/// - `files_scanned`: Total number of setups scanned so far
/// - `bytes_scanned`: Total bytes scanned so far
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Paths of the roots below `config.root` according to the layout.
///
/// With [`Layout::Tracks`] the configured root is the only root. With
/// [`Layout::Cars`] every non-hidden subdirectory is one.
pub fn discover_roots(config: &Config) -> Result<Vec<PathBuf>, SyncError> {
    match config.layout {
        Layout::Tracks => Ok(vec![config.root.clone()]),
        Layout::Cars => list_subdirs(&config.root),
    }
}

/// Non-hidden immediate subdirectories of `path`, sorted by name
pub fn list_subdirs(path: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let walker = ignore::WalkBuilder::new(path)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut dirs = Vec::new();
    for result in walker {
        let entry = result.map_err(|e| walk_error(path, e))?;
        if entry.depth() == 1 && entry.file_type().is_some_and(|ft| ft.is_dir()) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Create every required track folder missing from `root_path`.
///
/// Returns the names of the folders that were created.
pub fn ensure_tracks(root_path: &Path, tracks: &[String]) -> Result<Vec<String>, SyncError> {
    let mut created = Vec::new();
    for track in tracks {
        let track_path = root_path.join(track);
        if track_path.is_dir() {
            debug!(track = %track, "Track folder already exists");
            continue;
        }
        fs::create_dir_all(&track_path).map_err(|e| map_io_error(&track_path, e))?;
        info!(root = %root_path.display(), track = %track, "Created missing track folder");
        created.push(track.clone());
    }
    Ok(created)
}

/// Scan one root: its track folders and the setups inside them.
///
/// # Errors
/// * A missing or unreadable root is an error
/// * Unreadable entries below the root are logged and skipped
pub fn scan_root(
    root_path: &Path,
    excludes: &GlobSet,
    on_progress: Option<&ProgressCallback>,
) -> Result<SyncRoot, SyncError> {
    let start_time = Instant::now();
    let mut root = SyncRoot::new(root_path.to_path_buf());

    fs::read_dir(root_path).map_err(|e| map_io_error(root_path, e))?;

    let mut scanned_count: u64 = 0;
    let mut scanned_bytes: u64 = 0;

    let walker = ignore::WalkBuilder::new(root_path)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(2))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Error during directory traversal, continuing");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "Skipping non UTF-8 name");
            continue;
        };

        match entry.depth() {
            1 if file_type.is_dir() => root.add_track(&name),
            2 if file_type.is_file() => {
                if is_ignored_name(&name) || excludes.is_match(&name) {
                    debug!(path = %entry.path().display(), "Skipping excluded setup");
                    continue;
                }
                let Some(track) = entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .and_then(|t| t.to_str())
                else {
                    continue;
                };

                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(
                            path = %entry.path().display(),
                            error = %e,
                            "Failed to read metadata, skipping setup"
                        );
                        continue;
                    }
                };
                let Some(mtime) = setup_mtime(entry.path(), metadata.modified()) else {
                    continue;
                };

                root.insert(SetupFile::new(
                    track.to_string(),
                    name,
                    entry.path().to_path_buf(),
                    metadata.len(),
                    mtime,
                ));

                scanned_count += 1;
                scanned_bytes += metadata.len();
                if let Some(callback) = on_progress {
                    callback(scanned_count, scanned_bytes);
                }
            }
            _ => {}
        }
    }

    root.set_scan_duration(start_time.elapsed());
    debug!(
        root = %root_path.display(),
        tracks = root.tracks.len(),
        setups = root.len(),
        "Scanned root"
    );

    Ok(root)
}

/// Modification time of a setup, or `None` (logged) when the platform cannot report it
fn setup_mtime(path: &Path, modified: io::Result<SystemTime>) -> Option<SystemTime> {
    match modified {
        Ok(mtime) => Some(mtime),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read modification time, skipping setup");
            None
        }
    }
}

fn walk_error(path: &Path, error: ignore::Error) -> SyncError {
    match error.into_io_error() {
        Some(io) => map_io_error(path, io),
        None => SyncError::Validation(format!("Failed to list {}", path.display())),
    }
}
