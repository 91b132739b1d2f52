//! Atomic file copy implementation

use crate::types::{map_io_error, SyncError};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Temporary sibling a copy is written to before it is renamed into place.
///
/// The leading dot keeps it out of scans and watcher propagation.
pub fn part_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.part"))
}

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Write to a hidden `.<name>.part` sibling
/// 2. Flush and sync to disk
/// 3. Preserve metadata (permissions, mtime)
/// 4. Rename to the final destination
///
/// The destination's parent directory must exist; a track folder removed
/// while the tool runs is reported instead of being recreated.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(SyncError)` - IO error or other failure
///
/// # Example
/// ```no_run
/// use setupsync::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(
///     Path::new("Monza/Race1__sync-Monza.json"),
///     Path::new("Spa/Race1__sync-Monza.json"),
/// )?;
/// # Ok::<(), setupsync::types::SyncError>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path) -> Result<u64, SyncError> {
    let part = part_path(dest);
    let result = write_part_and_commit(src, &part, dest);
    if result.is_err() && part.exists() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn write_part_and_commit(src: &Path, part: &Path, dest: &Path) -> Result<u64, SyncError> {
    let mut src_file = File::open(src).map_err(|e| map_io_error(src, e))?;
    let mut part_file = File::create(part).map_err(|e| map_io_error(part, e))?;

    let mut buffer = vec![0u8; 128 * 1024];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = src_file.read(&mut buffer).map_err(|e| map_io_error(src, e))?;

        if bytes_read == 0 {
            break;
        }

        part_file
            .write_all(&buffer[0..bytes_read])
            .map_err(|e| map_io_error(part, e))?;
        total_bytes += bytes_read as u64;
    }

    part_file.sync_all().map_err(|e| map_io_error(part, e))?;

    // Drop the file handle before rename (required on Windows)
    drop(part_file);

    let src_metadata = fs::metadata(src).map_err(|e| map_io_error(src, e))?;
    fs::set_permissions(part, src_metadata.permissions()).map_err(|e| map_io_error(part, e))?;

    let mtime = src_metadata.modified().map_err(|e| map_io_error(src, e))?;
    filetime::set_file_mtime(part, filetime::FileTime::from_system_time(mtime))
        .map_err(|e| map_io_error(part, e))?;

    fs::rename(part, dest).map_err(|e| map_io_error(dest, e))?;

    Ok(total_bytes)
}
