//! Change watcher
//!
//! ```text
//! notify ──► std mpsc ──► from_notify ──► Propagator::handle
//! ```
//!
//! One thread drains the channel and handles events strictly in arrival
//! order. The loop wakes every [`POLL_INTERVAL`] to check for shutdown.

pub mod event;
pub mod propagate;
pub mod suppress;

use crate::types::SyncError;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

pub use event::{from_notify, locate, Location, SetupEvent};
pub use propagate::{Outcome, Propagator, WatchReport, WatchState};
pub use suppress::SuppressionSet;

/// How often the event loop checks for shutdown
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Exit status after a forced stop (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;

/// Cooperative stop flag shared with the event loop
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Trigger the flag. Returns `true` when it was already triggered.
    pub fn interrupt(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    /// Stop gracefully on the first Ctrl-C, exit on the second
    pub fn install_ctrl_c_handler(&self) -> Result<(), SyncError> {
        let shutdown = self.clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("ctrl-c".to_string())
            .spawn(move || {
                runtime.block_on(async {
                    loop {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            warn!(error = %e, "Cannot listen for Ctrl-C");
                            return;
                        }
                        if shutdown.interrupt() {
                            warn!("Second interrupt, exiting immediately");
                            std::process::exit(EXIT_INTERRUPTED);
                        }
                        info!("Interrupt received, stopping (press Ctrl-C again to force)");
                    }
                });
            })?;
        Ok(())
    }
}

/// Recursive watch on the top-level setups folder
pub struct SetupWatcher {
    // dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
    top: PathBuf,
}

impl SetupWatcher {
    pub fn new(top: &Path) -> Result<Self, SyncError> {
        let watch_error = |source| SyncError::WatchSetup {
            path: top.to_path_buf(),
            source,
        };

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx).map_err(watch_error)?;
        watcher
            .watch(top, RecursiveMode::Recursive)
            .map_err(watch_error)?;

        info!(path = %top.display(), "Watching for changes");
        Ok(Self {
            _watcher: watcher,
            rx,
            top: top.to_path_buf(),
        })
    }

    /// Feed events to `propagator` until `shutdown` is triggered
    pub fn run(self, propagator: &mut Propagator, shutdown: &Shutdown) -> Result<(), SyncError> {
        while !shutdown.is_triggered() {
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(raw)) => {
                    for event in from_notify(&raw) {
                        propagator.handle(event);
                    }
                }
                Ok(Err(e)) => error!(error = %e, "File watcher error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(path = %self.top.display(), "Watcher channel closed");
                    break;
                }
            }
        }

        info!(path = %self.top.display(), "Stopped watching");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let handle = shutdown.clone();
        assert!(!handle.is_triggered());

        shutdown.trigger();
        assert!(handle.is_triggered());
    }

    #[test]
    fn test_second_interrupt_is_reported() {
        let shutdown = Shutdown::new();
        let handler = shutdown.clone();

        assert!(!handler.interrupt());
        assert!(shutdown.is_triggered());
        assert!(handler.interrupt());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let err = SetupWatcher::new(Path::new("/nonexistent/setups/root"))
            .err()
            .expect("watch should fail");
        assert!(matches!(err, SyncError::WatchSetup { .. }));
    }
}
