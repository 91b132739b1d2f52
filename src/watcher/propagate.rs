//! Event propagation
//!
//! The [`Propagator`] applies one classified event at a time:
//!
//! ```text
//! Idle ──► EventReceived ──► Classified ──► Propagating ──► Idle
//! ```
//!
//! Writes go to every other track of the event's root, deletes are mirrored
//! for synchronized names only, and everything it touches is recorded in the
//! [`SuppressionSet`] so the echo of its own writes is dropped.

use crate::config::{Config, Layout};
use crate::executor::{copy_file_atomic, delete_setup, execute_action, rename_setup};
use crate::hash::{compute_hash, same_content};
use crate::naming::{assign_identity, is_ignored_name, is_synchronized};
use crate::plan::generate_init_plan;
use crate::scanner::{ensure_tracks, list_subdirs, scan_root};
use crate::types::{DeleteMode, SetupAction, SyncError};
use crate::watcher::event::{locate, Location, SetupEvent};
use crate::watcher::suppress::SuppressionSet;
use globset::GlobSet;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the propagator is in handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchState {
    #[default]
    Idle,
    EventReceived,
    Classified,
    Propagating,
}

/// What handling one event did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Dropped during classification
    pub ignored: bool,
    /// Caused by our own earlier write
    pub suppressed: bool,
    pub renamed: usize,
    pub written: usize,
    pub deleted: usize,
    /// Destinations that already matched
    pub unchanged: usize,
    pub failed: usize,
}

impl Outcome {
    fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    fn suppressed() -> Self {
        Self {
            suppressed: true,
            ..Self::default()
        }
    }

    /// Filesystem mutations performed
    pub fn operations(&self) -> usize {
        self.renamed + self.written + self.deleted
    }

    /// Nothing was done because the event was ignored or suppressed
    fn dropped(&self) -> bool {
        self.ignored || self.suppressed
    }

    fn merge(&mut self, other: Outcome) {
        let dropped = self.dropped() && other.dropped();
        self.suppressed = dropped && (self.suppressed || other.suppressed);
        self.ignored = self.ignored && other.ignored;
        self.renamed += other.renamed;
        self.written += other.written;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
    }
}

/// Counters over a whole watch session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub events: usize,
    pub ignored: usize,
    pub suppressed: usize,
    pub renamed: usize,
    pub written: usize,
    pub deleted: usize,
    pub failed: usize,
    pub rescans: usize,
}

impl WatchReport {
    fn record(&mut self, outcome: &Outcome) {
        self.events += 1;
        if outcome.ignored {
            self.ignored += 1;
        }
        if outcome.suppressed {
            self.suppressed += 1;
        }
        self.renamed += outcome.renamed;
        self.written += outcome.written;
        self.deleted += outcome.deleted;
        self.failed += outcome.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Write,
    Remove,
    /// A setup moved in from another track of the same root
    Arrive,
}

/// Applies filesystem events to the other tracks of their root
pub struct Propagator {
    top: PathBuf,
    layout: Layout,
    delete_mode: DeleteMode,
    excludes: GlobSet,
    required_tracks: Vec<String>,
    roots: BTreeMap<PathBuf, BTreeSet<String>>,
    suppression: SuppressionSet,
    state: WatchState,
    report: WatchReport,
}

impl Propagator {
    /// Discover roots and tracks below `config.root`.
    ///
    /// Required track folders are created.
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let mut propagator = Self {
            top: config.root.clone(),
            layout: config.layout,
            delete_mode: config.delete_mode,
            excludes: config.exclude_matcher()?,
            required_tracks: config.required_tracks.clone(),
            roots: BTreeMap::new(),
            suppression: SuppressionSet::new(config.watch_settle),
            state: WatchState::Idle,
            report: WatchReport::default(),
        };
        propagator.roots = propagator.discover()?;
        Ok(propagator)
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn report(&self) -> &WatchReport {
        &self.report
    }

    /// Known track names of `root`
    pub fn tracks(&self, root: &Path) -> Option<&BTreeSet<String>> {
        self.roots.get(root)
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: SetupEvent) -> Outcome {
        self.state = WatchState::EventReceived;
        debug!(event = ?event, "Event received");

        let outcome = match event {
            SetupEvent::Renamed { from, to } if is_track_move(&from, &to) => {
                // the identity still exists in the root, so nothing is deleted
                self.handle_path(&to, Change::Arrive)
            }
            SetupEvent::Renamed { from, to } => {
                let mut outcome = self.handle_path(&from, Change::Remove);
                outcome.merge(self.handle_path(&to, Change::Write));
                outcome
            }
            SetupEvent::Created(path) | SetupEvent::Modified(path) => {
                self.handle_path(&path, Change::Write)
            }
            SetupEvent::Deleted(path) => self.handle_path(&path, Change::Remove),
        };

        self.report.record(&outcome);
        self.state = WatchState::Idle;
        outcome
    }

    fn handle_path(&mut self, path: &Path, change: Change) -> Outcome {
        self.state = WatchState::Classified;

        let Some(location) = locate(&self.top, self.layout, path) else {
            return Outcome::ignored();
        };

        let (root, track, name) = match location {
            Location::Folder { root, name } => {
                if path.is_dir() || self.is_known_folder(&root, &name, path) {
                    return self.rescan();
                }
                return Outcome::ignored();
            }
            Location::Setup { root, track, name } => (root, track, name),
        };

        if self.excludes.is_match(&name) {
            return Outcome::ignored();
        }

        let known = self
            .roots
            .get(&root)
            .is_some_and(|tracks| tracks.contains(&track));
        if !known {
            // a track folder created before we saw its directory event
            if root.join(&track).is_dir() {
                return self.rescan();
            }
            return Outcome::ignored();
        }

        // a move always leaves its old track short of a copy
        if change != Change::Arrive && self.suppression.is_self_originated(path) {
            return Outcome::suppressed();
        }

        self.state = WatchState::Propagating;
        match change {
            Change::Write | Change::Arrive => self.propagate_write(&root, &track, &name),
            Change::Remove => self.propagate_removal(&root, &track, &name),
        }
    }

    fn propagate_write(&mut self, root: &Path, track: &str, name: &str) -> Outcome {
        let mut outcome = Outcome::default();
        let path = root.join(track).join(name);
        if !path.is_file() {
            debug!(path = %path.display(), "Setup no longer exists, nothing to propagate");
            return Outcome::ignored();
        }

        let identity = if is_synchronized(name) {
            name.to_string()
        } else {
            match self.adopt(root, track, name) {
                Ok(identity) => {
                    outcome.renamed += 1;
                    identity
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot assign identity");
                    outcome.failed += 1;
                    return outcome;
                }
            }
        };

        let source = root.join(track).join(&identity);
        let hash = match compute_hash(&source) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "Cannot read setup");
                outcome.failed += 1;
                return outcome;
            }
        };

        for other in self.other_tracks(root, track) {
            let dest = root.join(&other).join(&identity);
            match same_content(&source, &hash, &dest) {
                Ok(true) => {
                    outcome.unchanged += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %dest.display(), error = %e, "Cannot compare destination, skipping");
                    outcome.failed += 1;
                    continue;
                }
            }

            match copy_file_atomic(&source, &dest) {
                Ok(bytes) => {
                    self.suppression.record_write(&dest, hash);
                    outcome.written += 1;
                    info!(from = %source.display(), to = %dest.display(), bytes, "Propagated setup");
                }
                Err(e) => {
                    warn!(path = %dest.display(), error = %e, "Propagation failed, skipping track");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    fn propagate_removal(&mut self, root: &Path, track: &str, name: &str) -> Outcome {
        if !root.join(track).is_dir() {
            // the whole track folder went away, not this setup
            return self.rescan();
        }
        let path = root.join(track).join(name);
        if fs::symlink_metadata(&path).is_ok() {
            debug!(path = %path.display(), "Setup exists again, not propagating delete");
            return Outcome::ignored();
        }
        if !is_synchronized(name) {
            debug!(path = %path.display(), "Unsynchronized name is not shared, nothing to delete");
            return Outcome::ignored();
        }

        let mut outcome = Outcome::default();
        for other in self.other_tracks(root, track) {
            let dest = root.join(&other).join(name);
            match delete_setup(&dest, self.delete_mode) {
                Ok(true) => {
                    self.suppression.record_removal(&dest);
                    outcome.deleted += 1;
                }
                Ok(false) => outcome.unchanged += 1,
                Err(e) => {
                    warn!(path = %dest.display(), error = %e, "Delete failed, skipping track");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Give a new setup its identity in place
    fn adopt(&mut self, root: &Path, track: &str, name: &str) -> Result<String, SyncError> {
        let taken = self.names_in(root);
        let identity = assign_identity(name, track, |n| taken.contains(n))?;

        let from = root.join(track).join(name);
        let to = root.join(track).join(&identity);
        rename_setup(&from, &to)?;
        self.suppression.record_removal(&from);
        self.suppression.record_write(&to, compute_hash(&to)?);
        Ok(identity)
    }

    /// Re-discover roots and tracks; seed tracks that appeared
    fn rescan(&mut self) -> Outcome {
        let mut outcome = Outcome::default();
        self.report.rescans += 1;

        let discovered = match self.discover() {
            Ok(roots) => roots,
            Err(e) => {
                warn!(error = %e, "Re-scan failed");
                outcome.failed += 1;
                return outcome;
            }
        };

        let mut seeds = Vec::new();
        for (root, tracks) in &discovered {
            let known = self.roots.get(root);
            let added: Vec<&String> = tracks
                .iter()
                .filter(|t| !known.is_some_and(|k| k.contains(*t)))
                .collect();
            if !added.is_empty() {
                info!(root = %root.display(), tracks = ?added, "New track folders");
                seeds.push(root.clone());
            }
        }
        for (root, tracks) in &self.roots {
            let current = discovered.get(root);
            for track in tracks {
                if !current.is_some_and(|c| c.contains(track)) {
                    info!(root = %root.display(), track = %track, "Track folder removed");
                }
            }
        }

        self.roots = discovered;
        for root in seeds {
            outcome.merge(self.seed(&root));
        }
        outcome
    }

    /// Run the initial copier on one root, recording every write
    fn seed(&mut self, root: &Path) -> Outcome {
        let mut outcome = Outcome::default();
        let scanned = match scan_root(root, &self.excludes, None) {
            Ok(scanned) => scanned,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Cannot scan root");
                outcome.failed += 1;
                return outcome;
            }
        };

        let plan = generate_init_plan(&scanned);
        outcome.failed += plan.collisions.len();
        for action in &plan.actions {
            match self.apply(action) {
                Ok(()) => match action {
                    SetupAction::Rename { .. } => outcome.renamed += 1,
                    SetupAction::Copy { .. } => outcome.written += 1,
                },
                Err(e) => {
                    warn!(action = action.action_name(), path = %action.target().display(), error = %e, "Seeding action failed");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    fn apply(&mut self, action: &SetupAction) -> Result<(), SyncError> {
        execute_action(action)?;
        match action {
            SetupAction::Rename { from, to } => {
                self.suppression.record_removal(from);
                self.suppression.record_write(to, compute_hash(to)?);
            }
            SetupAction::Copy { dest, .. } => {
                self.suppression.record_write(dest, compute_hash(dest)?);
            }
        }
        Ok(())
    }

    fn discover(&self) -> Result<BTreeMap<PathBuf, BTreeSet<String>>, SyncError> {
        let root_paths = match self.layout {
            Layout::Tracks => vec![self.top.clone()],
            Layout::Cars => list_subdirs(&self.top)?,
        };

        let mut roots = BTreeMap::new();
        for root in root_paths {
            ensure_tracks(&root, &self.required_tracks)?;
            let tracks: BTreeSet<String> = list_subdirs(&root)?
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .collect();
            roots.insert(root, tracks);
        }
        Ok(roots)
    }

    /// A track folder, or a car folder with the car layout, seen before
    fn is_known_folder(&self, root: &Path, name: &str, path: &Path) -> bool {
        self.roots.get(root).is_some_and(|tracks| tracks.contains(name))
            || self.roots.contains_key(path)
    }

    fn other_tracks(&self, root: &Path, track: &str) -> Vec<String> {
        self.roots
            .get(root)
            .map(|tracks| tracks.iter().filter(|t| *t != track).cloned().collect())
            .unwrap_or_default()
    }

    /// Every setup name currently present in any track of `root`
    fn names_in(&self, root: &Path) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let Some(tracks) = self.roots.get(root) else {
            return names;
        };
        for track in tracks {
            let dir = root.join(track);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Cannot list track folder");
                    continue;
                }
            };
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if !is_ignored_name(name) {
                        names.insert(name.to_string());
                    }
                }
            }
        }
        names
    }
}

/// Same file name moved between two track folders of one root
fn is_track_move(from: &Path, to: &Path) -> bool {
    let root_of = |p: &Path| p.parent().and_then(Path::parent).map(Path::to_path_buf);
    from != to && from.file_name() == to.file_name() && root_of(from) == root_of(to)
}
