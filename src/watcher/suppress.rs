//! Self-origin suppression
//!
//! Every path the propagator writes, renames, or removes is recorded with the
//! state it left behind. An event on such a path inside the settle window is
//! ours when the path is still in that state; a later external change to the
//! same path does not match and is propagated normally.

use crate::hash::try_compute_hash;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// State a recorded path was left in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// We wrote these bytes
    Content([u8; 32]),
    /// We removed or renamed the file away
    Absent,
}

/// Paths recently touched by the propagator
#[derive(Debug)]
pub struct SuppressionSet {
    window: Duration,
    entries: HashMap<PathBuf, (Expected, Instant)>,
}

impl SuppressionSet {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    /// Record that we wrote `hash` to `path`
    pub fn record_write(&mut self, path: &Path, hash: [u8; 32]) {
        self.entries
            .insert(path.to_path_buf(), (Expected::Content(hash), Instant::now()));
    }

    /// Record that we removed `path`
    pub fn record_removal(&mut self, path: &Path) {
        self.entries
            .insert(path.to_path_buf(), (Expected::Absent, Instant::now()));
    }

    /// Check if the current event on `path` was caused by our own write.
    ///
    /// Entries are kept until the window expires, since one write produces
    /// several events (create, modify, close).
    pub fn is_self_originated(&mut self, path: &Path) -> bool {
        self.prune();

        let Some((expected, _)) = self.entries.get(path) else {
            return false;
        };

        let matches = match expected {
            Expected::Absent => std::fs::symlink_metadata(path).is_err(),
            Expected::Content(hash) => match try_compute_hash(path) {
                Ok(Some(current)) => &current == hash,
                Ok(None) => false,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot hash suppressed path");
                    false
                }
            },
        };

        if matches {
            debug!(path = %path.display(), "Ignoring self-originated event");
        }
        matches
    }

    /// Drop entries older than the window
    pub fn prune(&mut self) {
        let window = self.window;
        self.entries
            .retain(|_, (_, recorded)| recorded.elapsed() < window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
