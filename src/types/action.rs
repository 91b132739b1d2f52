//! SetupAction - Filesystem mutations planned by the copier and watcher

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One filesystem mutation on a setup file. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupAction {
    /// Give an unsynchronized setup its global identity (same track folder)
    Rename { from: PathBuf, to: PathBuf },

    /// Copy a setup into a track folder that does not have it yet
    Copy {
        source: PathBuf,
        dest: PathBuf,
        size: u64,
    },
}

impl SetupAction {
    /// Human label used in events and summaries
    pub fn action_name(&self) -> &'static str {
        match self {
            SetupAction::Rename { .. } => "Rename",
            SetupAction::Copy { .. } => "Copy",
        }
    }

    /// Path the action writes to
    pub fn target(&self) -> &Path {
        match self {
            SetupAction::Rename { to, .. } => to,
            SetupAction::Copy { dest, .. } => dest,
        }
    }

    /// Bytes this action is expected to transfer
    pub fn transfer_size(&self) -> u64 {
        match self {
            SetupAction::Copy { size, .. } => *size,
            SetupAction::Rename { .. } => 0,
        }
    }
}

/// What a propagated delete does with the other tracks' copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Move to `<root>/.setupsync_trash/`
    #[default]
    Trash,

    /// Remove the file
    Permanent,
}
