//! Executor module for file operations

pub mod copy;
pub mod trash;

use crate::plan::SyncPlan;
use crate::types::{map_io_error, DeleteMode, SetupAction, SyncError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use copy::copy_file_atomic;
pub use trash::move_to_trash;

/// Execution progress statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of actions in the input plan.
    pub total_actions: usize,
    /// Number of successfully processed actions.
    pub completed_actions: usize,
    /// Number of failed actions.
    pub failed_actions: usize,
    /// Aggregate copied bytes.
    pub bytes_copied: u64,
}

/// Events emitted while executing a plan.
#[derive(Debug)]
pub enum ExecutionEvent<'a> {
    /// Action execution started.
    ActionStart {
        index: usize,
        total: usize,
        action: &'static str,
        path: &'a Path,
    },
    /// Action execution succeeded.
    ActionSuccess {
        index: usize,
        total: usize,
        action: &'static str,
        path: &'a Path,
        bytes_copied: u64,
    },
    /// Action execution failed but executor continued.
    ActionError {
        index: usize,
        total: usize,
        action: &'static str,
        path: &'a Path,
        error: &'a SyncError,
    },
    /// Plan execution completed (with or without errors).
    Complete { stats: ExecutionStats },
}

/// Optional callback used to receive execution events.
pub type ExecutionCallback = dyn for<'a> Fn(&ExecutionEvent<'a>) + Send + Sync;

/// Execute a plan
///
/// Executes actions sequentially, continues on per-file failures, and returns
/// [`SyncError::Incomplete`] summarizing them if any action fails.
pub fn execute_plan(
    plan: &SyncPlan,
    on_event: Option<&ExecutionCallback>,
) -> Result<ExecutionStats, SyncError> {
    let mut stats = ExecutionStats {
        total_actions: plan.actions.len(),
        ..Default::default()
    };
    let mut errors: Vec<(PathBuf, SyncError)> = Vec::new();

    for (idx, action) in plan.actions.iter().enumerate() {
        let index = idx + 1;
        emit_event(
            on_event,
            ExecutionEvent::ActionStart {
                index,
                total: stats.total_actions,
                action: action.action_name(),
                path: action.target(),
            },
        );

        match execute_action(action) {
            Ok(bytes) => {
                stats.completed_actions += 1;
                stats.bytes_copied += bytes;

                emit_event(
                    on_event,
                    ExecutionEvent::ActionSuccess {
                        index,
                        total: stats.total_actions,
                        action: action.action_name(),
                        path: action.target(),
                        bytes_copied: bytes,
                    },
                );
            }
            Err(err) => {
                stats.failed_actions += 1;
                warn!(
                    action = action.action_name(),
                    path = %action.target().display(),
                    error = %err,
                    "Action failed, continuing"
                );

                emit_event(
                    on_event,
                    ExecutionEvent::ActionError {
                        index,
                        total: stats.total_actions,
                        action: action.action_name(),
                        path: action.target(),
                        error: &err,
                    },
                );

                errors.push((action.target().to_path_buf(), err));
            }
        }
    }

    emit_event(
        on_event,
        ExecutionEvent::Complete {
            stats: stats.clone(),
        },
    );

    if errors.is_empty() {
        Ok(stats)
    } else {
        Err(SyncError::Incomplete {
            failed: errors.len(),
            summary: build_error_summary(&errors),
        })
    }
}

/// Apply one action. Returns the number of bytes copied.
pub fn execute_action(action: &SetupAction) -> Result<u64, SyncError> {
    match action {
        SetupAction::Rename { from, to } => rename_setup(from, to).map(|_| 0),
        SetupAction::Copy { source, dest, .. } => {
            if fs::symlink_metadata(dest).is_ok() {
                debug!(dest = %dest.display(), "Identity already present, not copying");
                return Ok(0);
            }
            let bytes = copy_file_atomic(source, dest)?;
            info!(from = %source.display(), to = %dest.display(), "Copied setup");
            Ok(bytes)
        }
    }
}

/// Rename a setup without ever replacing an existing file.
pub fn rename_setup(from: &Path, to: &Path) -> Result<(), SyncError> {
    if fs::symlink_metadata(to).is_ok() {
        return Err(SyncError::NameCollision {
            name: to
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            track: to
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        });
    }

    fs::rename(from, to).map_err(|e| map_io_error(from, e))?;
    info!(from = %from.display(), to = %to.display(), "Renamed setup");
    Ok(())
}

/// Delete a setup copy according to the delete mode.
///
/// Returns `false` when there was nothing to delete.
pub fn delete_setup(path: &Path, delete_mode: DeleteMode) -> Result<bool, SyncError> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(false);
    }

    match delete_mode {
        DeleteMode::Trash => {
            let trashed = move_to_trash(path)?;
            info!(path = %path.display(), trash = %trashed.display(), "Moved setup to trash");
        }
        DeleteMode::Permanent => match fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "Deleted setup"),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(map_io_error(path, e)),
        },
    }
    Ok(true)
}

fn emit_event(on_event: Option<&ExecutionCallback>, event: ExecutionEvent<'_>) {
    if let Some(callback) = on_event {
        callback(&event);
    }
}

fn build_error_summary(errors: &[(PathBuf, SyncError)]) -> String {
    let preview = errors
        .iter()
        .take(3)
        .map(|(path, err)| format!("{}: {}", path.display(), err))
        .collect::<Vec<_>>()
        .join("; ");

    format!("Example failures: {}", preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn tracks(dir: &TempDir, names: &[&str]) {
        for name in names {
            fs::create_dir_all(dir.path().join(name)).expect("create track");
        }
    }

    #[test]
    fn test_execute_plan_rename_then_copy() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Monza", "Spa"]);
        fs::write(root.path().join("Monza/Race1.json"), b"wing=4").expect("write setup");

        let renamed = root.path().join("Monza/Race1__sync-Monza.json");
        let mut plan = SyncPlan::new();
        plan.add_action(SetupAction::Rename {
            from: root.path().join("Monza/Race1.json"),
            to: renamed.clone(),
        });
        plan.add_action(SetupAction::Copy {
            source: renamed.clone(),
            dest: root.path().join("Spa/Race1__sync-Monza.json"),
            size: 6,
        });

        let stats = execute_plan(&plan, None).expect("execute plan");

        assert_eq!(stats.completed_actions, 2);
        assert_eq!(stats.bytes_copied, 6);
        assert!(!root.path().join("Monza/Race1.json").exists());
        assert_eq!(
            fs::read(root.path().join("Spa/Race1__sync-Monza.json")).expect("read copy"),
            b"wing=4"
        );
    }

    #[test]
    fn test_copy_never_replaces_existing_identity() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Monza", "Spa"]);
        fs::write(root.path().join("Monza/a.json"), b"new").expect("write source");
        fs::write(root.path().join("Spa/a.json"), b"keep").expect("write dest");

        let action = SetupAction::Copy {
            source: root.path().join("Monza/a.json"),
            dest: root.path().join("Spa/a.json"),
            size: 3,
        };
        assert_eq!(execute_action(&action).expect("copy"), 0);
        assert_eq!(fs::read(root.path().join("Spa/a.json")).expect("read"), b"keep");
    }

    #[test]
    fn test_rename_onto_existing_file_is_collision() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Monza"]);
        fs::write(root.path().join("Monza/a.json"), b"one").expect("write a");
        fs::write(root.path().join("Monza/b.json"), b"two").expect("write b");

        let err = rename_setup(&root.path().join("Monza/a.json"), &root.path().join("Monza/b.json"))
            .unwrap_err();

        assert!(err.is_collision());
        assert_eq!(fs::read(root.path().join("Monza/b.json")).expect("read b"), b"two");
        assert!(root.path().join("Monza/a.json").exists());
    }

    #[test]
    fn test_delete_trash_and_permanent() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Spa"]);
        let trashed = root.path().join("Spa/a.json");
        let removed = root.path().join("Spa/b.json");
        fs::write(&trashed, b"a").expect("write a");
        fs::write(&removed, b"b").expect("write b");

        assert!(delete_setup(&trashed, DeleteMode::Trash).expect("trash"));
        assert!(delete_setup(&removed, DeleteMode::Permanent).expect("delete"));
        assert!(!trashed.exists());
        assert!(!removed.exists());
        assert!(root.path().join(trash::TRASH_DIR).is_dir());

        assert!(!delete_setup(&removed, DeleteMode::Permanent).expect("missing is ok"));
    }

    #[test]
    fn test_execute_plan_continue_on_error() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Monza", "Spa"]);
        fs::write(root.path().join("Monza/good.json"), b"good").expect("write good");

        let mut plan = SyncPlan::new();
        plan.add_action(SetupAction::Copy {
            source: root.path().join("Monza/missing.json"),
            dest: root.path().join("Spa/missing.json"),
            size: 10,
        });
        plan.add_action(SetupAction::Copy {
            source: root.path().join("Monza/good.json"),
            dest: root.path().join("Spa/good.json"),
            size: 4,
        });

        let err = execute_plan(&plan, None).unwrap_err();
        assert!(matches!(err, SyncError::Incomplete { failed: 1, .. }));
        assert!(root.path().join("Spa/good.json").exists());
        assert!(!root.path().join("Spa/.missing.json.part").exists());
    }

    #[test]
    fn test_copy_into_missing_track_fails() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Monza"]);
        fs::write(root.path().join("Monza/a.json"), b"a").expect("write");

        let action = SetupAction::Copy {
            source: root.path().join("Monza/a.json"),
            dest: root.path().join("Gone/a.json"),
            size: 1,
        };
        assert!(execute_action(&action).is_err());
        assert!(!root.path().join("Gone").exists());
    }

    #[test]
    fn test_execute_plan_emits_events() {
        let root = TempDir::new().expect("create root");
        tracks(&root, &["Monza", "Spa"]);
        fs::write(root.path().join("Monza/a.json"), b"a").expect("write");

        let mut plan = SyncPlan::new();
        plan.add_action(SetupAction::Copy {
            source: root.path().join("Monza/a.json"),
            dest: root.path().join("Spa/a.json"),
            size: 1,
        });

        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let events_ref = Arc::clone(&events);
        let callback = move |event: &ExecutionEvent<'_>| {
            let label = match event {
                ExecutionEvent::ActionStart { .. } => "start",
                ExecutionEvent::ActionSuccess { .. } => "success",
                ExecutionEvent::ActionError { .. } => "error",
                ExecutionEvent::Complete { .. } => "complete",
            };
            events_ref
                .lock()
                .expect("lock events")
                .push(label.to_string());
        };

        execute_plan(&plan, Some(&callback)).expect("execute plan");

        let snapshot = events.lock().expect("lock events snapshot").clone();
        assert_eq!(snapshot, vec!["start", "success", "complete"]);
    }
}
