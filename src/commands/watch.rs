//! Watch command

use crate::types::SyncError;
use crate::watcher::{Propagator, SetupWatcher, Shutdown, WatchReport};
use crate::Config;
use tracing::info;

/// Watch `config.root` and propagate changes until `shutdown` triggers
pub fn run(config: &Config, shutdown: &Shutdown) -> Result<WatchReport, SyncError> {
    // watch first so nothing created during discovery is missed
    let watcher = SetupWatcher::new(&config.root)?;
    let mut propagator = Propagator::new(config)?;

    watcher.run(&mut propagator, shutdown)?;

    let report = propagator.report().clone();
    info!(
        events = report.events,
        written = report.written,
        deleted = report.deleted,
        failed = report.failed,
        "Watch session finished"
    );
    println!("{}", format_watch_summary(&report));
    Ok(report)
}

fn format_watch_summary(report: &WatchReport) -> String {
    format!(
        "Watch summary:\n  Events: {} ({} ignored, {} self-originated)\n  Renamed: {}  Written: {}  Deleted: {}  Failed: {}",
        report.events,
        report.ignored,
        report.suppressed,
        report.renamed,
        report.written,
        report.deleted,
        report.failed
    )
}
