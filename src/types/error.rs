//! Error types for setupsync

use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for setupsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Permission denied for specific path
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path exceeds the platform limit
    #[error("Path too long: {path}")]
    PathTooLong { path: PathBuf },

    /// Disk full error
    #[error("Disk full while writing {path}")]
    DiskFull { path: PathBuf },

    /// Two distinct setups would end up under the same name
    #[error("Name collision: {name} in track {track}")]
    NameCollision { name: String, track: String },

    /// The filesystem watch could not be established
    #[error("Failed to watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Some actions of a run failed; the rest were applied
    #[error("{failed} action(s) failed: {summary}")]
    Incomplete { failed: usize, summary: String },
}

impl SyncError {
    /// Check if this error leaves the tree in a state a re-run can finish
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::Incomplete { .. } | SyncError::NameCollision { .. }
        )
    }

    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::Config(_))
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        matches!(self, SyncError::PermissionDenied { .. })
    }

    /// Check if this error is related to disk space
    pub fn is_disk_space_error(&self) -> bool {
        matches!(self, SyncError::DiskFull { .. })
    }

    /// Check if this error is a naming collision
    pub fn is_collision(&self) -> bool {
        matches!(self, SyncError::NameCollision { .. })
    }

    /// Short label used when grouping errors in summaries
    pub fn kind_label(&self) -> &'static str {
        match self {
            SyncError::Io(_) => "I/O error",
            SyncError::Config(_) => "Configuration error",
            SyncError::Validation(_) => "Validation error",
            SyncError::PermissionDenied { .. } => "Permission denied",
            SyncError::PathTooLong { .. } => "Path too long",
            SyncError::DiskFull { .. } => "Disk full",
            SyncError::NameCollision { .. } => "Name collision",
            SyncError::WatchSetup { .. } => "Watch setup failure",
            SyncError::Incomplete { .. } => "Incomplete run",
        }
    }
}

/// Classify an `io::Error` raised while touching `path`.
pub fn map_io_error(path: &Path, error: Error) -> SyncError {
    if matches!(error.kind(), ErrorKind::PermissionDenied) {
        SyncError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else if matches!(error.kind(), ErrorKind::StorageFull)
        || matches!(error.raw_os_error(), Some(28 | 122) if cfg!(unix))
        || matches!(error.raw_os_error(), Some(39 | 112) if cfg!(windows))
    {
        SyncError::DiskFull {
            path: path.to_path_buf(),
        }
    } else if matches!(error.raw_os_error(), Some(36) if cfg!(target_os = "linux"))
        || matches!(error.raw_os_error(), Some(63) if cfg!(target_os = "macos"))
        || matches!(error.raw_os_error(), Some(206) if cfg!(windows))
    {
        SyncError::PathTooLong {
            path: path.to_path_buf(),
        }
    } else {
        SyncError::Io(error)
    }
}
