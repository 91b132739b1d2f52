//! Initial copier command

use crate::executor::{execute_plan, ExecutionEvent, ExecutionStats};
use crate::plan::{generate_init_plan, PlanStats, SyncPlan};
use crate::scanner::{discover_roots, ensure_tracks, scan_root, ProgressCallback};
use crate::types::{SetupAction, SyncError};
use crate::ui::ProgressReporter;
use crate::Config;
use indicatif::HumanBytes;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Result of one initial copier run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub roots: usize,
    pub tracks: usize,
    pub plan: PlanStats,
    /// Setups left without an identity
    pub collisions: usize,
    /// `None` for a dry run
    pub execution: Option<ExecutionStats>,
}

/// Run the initial copier over every root of `config`
///
/// Failed actions are reported and skipped; the run then ends with
/// [`SyncError::Incomplete`].
pub fn run(config: &Config) -> Result<InitReport, SyncError> {
    let reporter = Arc::new(Mutex::new(ProgressReporter::new()));
    let excludes = config.exclude_matcher()?;

    let mut report = InitReport::default();
    let mut plan = SyncPlan::new();
    let mut setups = 0usize;
    let mut bytes = 0u64;

    for root_path in discover_roots(config)? {
        if !config.dry_run {
            ensure_tracks(&root_path, &config.required_tracks)?;
        }

        if let Ok(progress) = reporter.lock() {
            progress.start_scan(&root_path);
        }
        let scan_progress: ProgressCallback = {
            let reporter = Arc::clone(&reporter);
            let root_path = root_path.clone();
            Box::new(move |files: u64, bytes: u64| {
                if let Ok(progress) = reporter.lock() {
                    progress.update_scan(&root_path, files, bytes);
                }
            })
        };
        let root = scan_root(&root_path, &excludes, Some(&scan_progress))?;

        report.roots += 1;
        report.tracks += root.tracks.len();
        setups += root.len();
        bytes += root.total_size;
        plan.extend(generate_init_plan(&root));
    }

    if let Ok(progress) = reporter.lock() {
        progress.finish_scan(report.roots, report.tracks, setups, bytes);
    }

    report.plan = plan.stats.clone();
    report.collisions = plan.collisions.len();
    println!("{}", format_plan_preview(&plan));
    for path in &plan.collisions {
        println!("  No free name for {}", display_relative(&config.root, path));
    }

    if config.dry_run {
        println!("{}", format_dry_run_actions(&plan, &config.root));
        println!("Dry-run mode: no changes were made.");
        return Ok(report);
    }

    if !plan.has_executable_actions() {
        println!("Nothing to sync.");
        return collisions_result(report, &plan);
    }

    if let Ok(mut progress) = reporter.lock() {
        progress.start_apply(plan.actions.len() as u64);
    }

    let rename_total = plan.stats.rename_count;
    let copy_total = plan.stats.copy_count;
    let error_records: Arc<Mutex<Vec<ErrorRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let progress_cb = {
        let reporter = Arc::clone(&reporter);
        let error_records = Arc::clone(&error_records);
        move |event: &ExecutionEvent| match event {
            ExecutionEvent::ActionStart { action, path, .. } => {
                if let Ok(progress) = reporter.lock() {
                    progress.set_current_action(action, Some(path));
                }
            }
            ExecutionEvent::ActionSuccess { bytes_copied, .. } => {
                if let Ok(mut progress) = reporter.lock() {
                    progress.complete_action(*bytes_copied);
                }
            }
            ExecutionEvent::ActionError {
                action,
                path,
                error,
                ..
            } => {
                if let Ok(progress) = reporter.lock() {
                    progress.action_error(action, Some(path), &error.to_string());
                }
                if let Ok(mut records) = error_records.lock() {
                    records.push(ErrorRecord::new(Some(path), error));
                }
            }
            ExecutionEvent::Complete { stats } => {
                if let Ok(progress) = reporter.lock() {
                    progress.finish_apply(
                        stats.completed_actions,
                        stats.failed_actions,
                        stats.bytes_copied,
                        rename_total,
                        copy_total,
                    );
                }
            }
        }
    };

    let result = execute_plan(&plan, Some(&progress_cb));
    if let Ok(records) = error_records.lock() {
        if !records.is_empty() {
            println!("{}", format_error_summary(&records));
        }
    }

    let stats = result?;
    info!(
        renamed = plan.stats.rename_count,
        copied = plan.stats.copy_count,
        bytes = stats.bytes_copied,
        "Initial sync complete"
    );
    report.execution = Some(stats);
    collisions_result(report, &plan)
}

fn collisions_result(report: InitReport, plan: &SyncPlan) -> Result<InitReport, SyncError> {
    if plan.collisions.is_empty() {
        return Ok(report);
    }
    warn!(count = plan.collisions.len(), "Setups left without an identity");
    Err(SyncError::Incomplete {
        failed: plan.collisions.len(),
        summary: "no free synchronized name for some setups".to_string(),
    })
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn format_plan_preview(plan: &SyncPlan) -> String {
    format!(
        "Plan:\n  Rename: {}  Copy: {}\n  Total bytes to copy: {}",
        plan.stats.rename_count,
        plan.stats.copy_count,
        HumanBytes(plan.stats.total_bytes)
    )
}

fn format_dry_run_actions(plan: &SyncPlan, root: &Path) -> String {
    if plan.actions.is_empty() {
        return "Dry-run actions:\n  (no planned actions)".to_string();
    }

    let mut lines = Vec::with_capacity(plan.actions.len() + 1);
    lines.push("Dry-run actions:".to_string());
    for action in &plan.actions {
        match action {
            SetupAction::Rename { from, to } => lines.push(format!(
                "  RENAME    {} -> {}",
                display_relative(root, from),
                display_relative(root, to)
            )),
            SetupAction::Copy { source, dest, .. } => lines.push(format!(
                "  COPY      {} -> {}",
                display_relative(root, source),
                display_relative(root, dest)
            )),
        }
    }
    lines.join("\n")
}

#[derive(Debug)]
struct ErrorRecord {
    kind: &'static str,
    path: Option<PathBuf>,
    message: String,
    suggestion: Option<String>,
}

impl ErrorRecord {
    fn new(path: Option<&Path>, error: &SyncError) -> Self {
        let (message, suggestion) = humanize_error(error);
        Self {
            kind: error.kind_label(),
            path: path.map(PathBuf::from),
            message,
            suggestion,
        }
    }
}

fn humanize_error(error: &SyncError) -> (String, Option<String>) {
    match error {
        SyncError::Io(io) => match io.kind() {
            ErrorKind::NotFound => (
                "Setup or track folder was not found".to_string(),
                Some("It may have been moved while syncing; run --init again.".to_string()),
            ),
            ErrorKind::AlreadyExists => (
                "A file with the target name already exists".to_string(),
                Some("Run --init again to pick a free name.".to_string()),
            ),
            _ => (
                format!("I/O operation failed: {}", io),
                Some("Retry. If this keeps happening, check disk health and permissions.".to_string()),
            ),
        },
        SyncError::PermissionDenied { .. } => (
            "Permission denied while accessing setup".to_string(),
            Some("Close the simulator or check folder permissions.".to_string()),
        ),
        SyncError::PathTooLong { .. } => (
            "Path exceeds the platform limit".to_string(),
            Some("Shorten the setup name or move the setups folder higher up.".to_string()),
        ),
        SyncError::DiskFull { .. } => (
            "Not enough disk space to complete operation".to_string(),
            Some("Free disk space and retry.".to_string()),
        ),
        SyncError::NameCollision { name, track } => (
            format!("{} already exists in track {}", name, track),
            Some("Run --init again to pick a free name.".to_string()),
        ),
        SyncError::Config(msg) | SyncError::Validation(msg) => (msg.clone(), None),
        SyncError::WatchSetup { .. } | SyncError::Incomplete { .. } => (error.to_string(), None),
    }
}

fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<&'static str, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.kind).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (kind, items) in groups {
        lines.push(format!("  {} ({}):", kind, items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}", record.message));
            if let Some(path) = &record.path {
                lines.push(format!("      Path: {}", path.display()));
            }
            if let Some(suggestion) = &record.suggestion {
                lines.push(format!("      Try: {}", suggestion));
            }
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more", items.len() - 3));
        }
    }
    lines.join("\n")
}
