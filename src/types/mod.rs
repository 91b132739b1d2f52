//! Core type definitions for setupsync

mod action;
mod entry;
mod error;
mod tree;

pub use action::{DeleteMode, SetupAction};
pub use entry::SetupFile;
pub use error::{map_io_error, SyncError};
pub use tree::SyncRoot;
