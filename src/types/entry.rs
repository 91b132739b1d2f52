//! SetupFile - One physical copy of a setup inside a track folder

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// A setup file as found by the scanner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetupFile {
    /// Track folder the copy lives in
    pub track: String,

    /// File name, which is the setup's identity once synchronized
    pub name: String,

    /// Absolute path of this copy
    pub path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub mtime: SystemTime,

    /// Blake3 content hash (computed lazily)
    pub hash: Option<[u8; 32]>,
}

impl SetupFile {
    /// Create a new SetupFile with the given parameters
    pub fn new(track: String, name: String, path: PathBuf, size: u64, mtime: SystemTime) -> Self {
        Self {
            track,
            name,
            path,
            size,
            mtime,
            hash: None,
        }
    }

    /// Set the hash for this setup
    pub fn with_hash(mut self, hash: [u8; 32]) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Check if this entry has a computed hash
    pub fn has_hash(&self) -> bool {
        self.hash.is_some()
    }
}
