//! Hashing utilities

use crate::types::{map_io_error, SyncError};
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Compute Blake3 hash of a file
///
/// The file is streamed in 64KB chunks.
///
/// # Example
/// ```no_run
/// use setupsync::hash::compute_hash;
/// use std::path::Path;
///
/// let hash = compute_hash(Path::new("Monza/Race1__sync-Monza.json"))?;
/// # Ok::<(), setupsync::types::SyncError>(())
/// ```
pub fn compute_hash(file_path: &Path) -> Result<[u8; 32], SyncError> {
    let mut file = File::open(file_path).map_err(|e| map_io_error(file_path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| map_io_error(file_path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[0..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Hash a file that may legitimately be missing.
pub fn try_compute_hash(file_path: &Path) -> Result<Option<[u8; 32]>, SyncError> {
    match compute_hash(file_path) {
        Ok(hash) => Ok(Some(hash)),
        Err(SyncError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check whether `dest` already holds exactly the bytes of `src`.
///
/// Sizes are compared first; hashes are only computed when they agree. A
/// missing destination never matches.
pub fn same_content(src: &Path, src_hash: &[u8; 32], dest: &Path) -> Result<bool, SyncError> {
    let dest_meta = match fs::metadata(dest) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(map_io_error(dest, e)),
    };
    let src_meta = fs::metadata(src).map_err(|e| map_io_error(src, e))?;

    if !dest_meta.is_file() || dest_meta.len() != src_meta.len() {
        return Ok(false);
    }

    Ok(&compute_hash(dest)? == src_hash)
}
