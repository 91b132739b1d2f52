//! Filesystem event classification

use crate::config::Layout;
use crate::naming::is_ignored_name;
use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// A filesystem change under the watched tree, decoupled from `notify`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupEvent {
    /// A file or directory appeared at the path
    Created(PathBuf),
    /// Content or metadata of the path changed
    Modified(PathBuf),
    /// The path no longer exists
    Deleted(PathBuf),
    /// The path was renamed or moved
    Renamed { from: PathBuf, to: PathBuf },
}

impl SetupEvent {
    /// Primary path of the event (the destination for renames)
    pub fn path(&self) -> &Path {
        match self {
            SetupEvent::Created(p) | SetupEvent::Modified(p) | SetupEvent::Deleted(p) => p,
            SetupEvent::Renamed { to, .. } => to,
        }
    }
}

/// Where an event path sits in the root → track → setup hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A track folder (or a car folder with the car layout)
    Folder { root: PathBuf, name: String },
    /// A setup file directly inside a track folder
    Setup {
        root: PathBuf,
        track: String,
        name: String,
    },
}

/// Convert a raw `notify` event into zero or more [`SetupEvent`]s
///
/// - `Create(*)` -> `Created`
/// - `Remove(*)` -> `Deleted`
/// - `Modify(Name(Both))` with two paths -> `Renamed`
/// - `Modify(Name(From))` -> `Deleted`, `Modify(Name(To))` -> `Created`
/// - `Modify(Name(_))` otherwise -> `Created` or `Deleted` depending on
///   whether the path still exists
/// - other `Modify(*)` -> `Modified`
/// - access and other kinds are dropped
pub fn from_notify(event: &notify::Event) -> Vec<SetupEvent> {
    let paths = &event.paths;
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    let mapped = match &event.kind {
        EventKind::Create(_) => vec![SetupEvent::Created(first.clone())],
        EventKind::Remove(_) => vec![SetupEvent::Deleted(first.clone())],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            vec![SetupEvent::Renamed {
                from: paths[0].clone(),
                to: paths[1].clone(),
            }]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            vec![SetupEvent::Deleted(first.clone())]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            vec![SetupEvent::Created(first.clone())]
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|p| {
                if p.exists() {
                    SetupEvent::Created(p.clone())
                } else {
                    SetupEvent::Deleted(p.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => vec![SetupEvent::Modified(first.clone())],
        _ => Vec::new(),
    };

    trace!(kind = ?event.kind, mapped = ?mapped, "Mapped notify event");
    mapped
}

/// Locate `path` relative to the watched `top` directory.
///
/// Returns `None` for the top itself, anything deeper than setup level,
/// hidden or temporary names, and paths outside `top`.
pub fn locate(top: &Path, layout: Layout, path: &Path) -> Option<Location> {
    let relative = path.strip_prefix(top).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str()?;
                if is_ignored_name(part) {
                    return None;
                }
                parts.push(part.to_string());
            }
            _ => return None,
        }
    }

    let depth = layout.setup_depth();
    if parts.is_empty() || parts.len() > depth {
        return None;
    }

    let root = match layout {
        Layout::Tracks => top.to_path_buf(),
        Layout::Cars if parts.len() == 1 => top.to_path_buf(),
        Layout::Cars => top.join(&parts[0]),
    };

    if parts.len() < depth {
        let name = parts.pop()?;
        return Some(Location::Folder { root, name });
    }

    let name = parts.pop()?;
    let track = parts.pop()?;
    Some(Location::Setup { root, track, name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_from_notify_basic_kinds() {
        assert_eq!(
            from_notify(&event(EventKind::Create(CreateKind::File), &["/r/Spa/a.json"])),
            vec![SetupEvent::Created(PathBuf::from("/r/Spa/a.json"))]
        );
        assert_eq!(
            from_notify(&event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/r/Spa/a.json"]
            )),
            vec![SetupEvent::Modified(PathBuf::from("/r/Spa/a.json"))]
        );
        assert_eq!(
            from_notify(&event(EventKind::Remove(RemoveKind::File), &["/r/Spa/a.json"])),
            vec![SetupEvent::Deleted(PathBuf::from("/r/Spa/a.json"))]
        );
    }

    #[test]
    fn test_from_notify_renames() {
        assert_eq!(
            from_notify(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/r/Spa/a.json", "/r/Spa/b.json"]
            )),
            vec![SetupEvent::Renamed {
                from: PathBuf::from("/r/Spa/a.json"),
                to: PathBuf::from("/r/Spa/b.json"),
            }]
        );
        assert_eq!(
            from_notify(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/r/Spa/a.json"]
            )),
            vec![SetupEvent::Deleted(PathBuf::from("/r/Spa/a.json"))]
        );
        assert_eq!(
            from_notify(&event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &["/r/Spa/b.json"]
            )),
            vec![SetupEvent::Created(PathBuf::from("/r/Spa/b.json"))]
        );
    }

    #[test]
    fn test_from_notify_ignores_access_and_empty() {
        assert!(from_notify(&event(
            EventKind::Access(notify::event::AccessKind::Any),
            &["/r/Spa/a.json"]
        ))
        .is_empty());
        assert!(from_notify(&event(EventKind::Create(CreateKind::File), &[])).is_empty());
    }

    #[test]
    fn test_locate_tracks_layout() {
        let top = Path::new("/setups");
        assert_eq!(
            locate(top, Layout::Tracks, Path::new("/setups/Spa/a.json")),
            Some(Location::Setup {
                root: PathBuf::from("/setups"),
                track: "Spa".to_string(),
                name: "a.json".to_string(),
            })
        );
        assert_eq!(
            locate(top, Layout::Tracks, Path::new("/setups/Spa")),
            Some(Location::Folder {
                root: PathBuf::from("/setups"),
                name: "Spa".to_string(),
            })
        );
        assert_eq!(locate(top, Layout::Tracks, Path::new("/setups")), None);
        assert_eq!(locate(top, Layout::Tracks, Path::new("/setups/Spa/x/a.json")), None);
        assert_eq!(locate(top, Layout::Tracks, Path::new("/setups/Spa/.a.json.part")), None);
        assert_eq!(
            locate(top, Layout::Tracks, Path::new("/setups/.setupsync_trash/t/Spa/a.json")),
            None
        );
        assert_eq!(locate(top, Layout::Tracks, Path::new("/elsewhere/Spa/a.json")), None);
    }

    #[test]
    fn test_locate_cars_layout() {
        let top = Path::new("/setups");
        assert_eq!(
            locate(top, Layout::Cars, Path::new("/setups/bmw/Spa/a.json")),
            Some(Location::Setup {
                root: PathBuf::from("/setups/bmw"),
                track: "Spa".to_string(),
                name: "a.json".to_string(),
            })
        );
        assert_eq!(
            locate(top, Layout::Cars, Path::new("/setups/bmw/Spa")),
            Some(Location::Folder {
                root: PathBuf::from("/setups/bmw"),
                name: "Spa".to_string(),
            })
        );
        assert_eq!(
            locate(top, Layout::Cars, Path::new("/setups/bmw")),
            Some(Location::Folder {
                root: PathBuf::from("/setups"),
                name: "bmw".to_string(),
            })
        );
    }
}
