//! # setupsync - keep racing-sim setups in every track folder
//!
//! Setups saved under one track are given a synchronized name
//! (`<stem>__sync-<origin-track>.<ext>`) and copied to every other track
//! folder. A watcher then mirrors later edits, renames, and deletes.

// Module declarations
pub mod config;
pub mod scanner;
pub mod plan;
pub mod executor;
pub mod hash;
pub mod naming;
pub mod watcher;
pub mod ui;
pub mod commands;
pub mod types;

// Re-export commonly used types
pub use types::{DeleteMode, SetupAction, SetupFile, SyncError, SyncRoot};
pub use config::Config;
pub use executor::ExecutionStats;

use std::path::Path;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the initial copier on one root with default settings.
///
/// Failed actions do not stop the run; they are collected into
/// [`SyncError::Incomplete`].
///
/// # Example
/// ```no_run
/// let stats = setupsync::synchronize(std::path::Path::new("/setups"))?;
/// println!("{} actions applied", stats.completed_actions);
/// # Ok::<(), setupsync::SyncError>(())
/// ```
pub fn synchronize(root: &Path) -> Result<ExecutionStats, SyncError> {
    let config = Config::for_root(root);
    config.validate()?;

    let excludes = config.exclude_matcher()?;
    let scanned = scanner::scan_root(root, &excludes, None)?;
    let plan = plan::generate_init_plan(&scanned);
    executor::execute_plan(&plan, None)
}
