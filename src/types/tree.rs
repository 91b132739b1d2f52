//! SyncRoot - A directory whose subfolders are tracks

use super::SetupFile;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tracks of one root and the setups each of them holds.
///
/// Both levels are ordered maps so that every plan derived from a root is
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRoot {
    /// Absolute path of the root
    pub path: PathBuf,

    /// Map: track name → (setup name → SetupFile)
    pub tracks: BTreeMap<String, BTreeMap<String, SetupFile>>,

    /// Aggregate statistics
    pub total_size: u64,
    pub total_files: usize,

    /// Scan metadata
    pub scan_duration: Duration,
}

impl SyncRoot {
    /// Create a root without tracks
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            tracks: BTreeMap::new(),
            total_size: 0,
            total_files: 0,
            scan_duration: Duration::from_secs(0),
        }
    }

    /// Register a track folder (no-op if known)
    pub fn add_track(&mut self, track: &str) {
        self.tracks.entry(track.to_string()).or_default();
    }

    /// Insert a setup into its track, registering the track if needed
    ///
    /// If the setup already exists, the old entry is replaced and statistics are adjusted.
    pub fn insert(&mut self, setup: SetupFile) {
        let setups = self.tracks.entry(setup.track.clone()).or_default();
        if let Some(old) = setups.get(&setup.name) {
            self.total_size = self.total_size.saturating_sub(old.size);
            self.total_files = self.total_files.saturating_sub(1);
        }

        self.total_size += setup.size;
        self.total_files += 1;
        setups.insert(setup.name.clone(), setup);
    }

    /// Track names in sorted order
    pub fn track_names(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }

    /// Check if a track folder is known
    pub fn has_track(&self, track: &str) -> bool {
        self.tracks.contains_key(track)
    }

    /// Check if `track` holds a setup called `name`
    pub fn contains(&self, track: &str, name: &str) -> bool {
        self.tracks
            .get(track)
            .is_some_and(|setups| setups.contains_key(name))
    }

    /// Get a setup by track and name
    pub fn get(&self, track: &str, name: &str) -> Option<&SetupFile> {
        self.tracks.get(track).and_then(|setups| setups.get(name))
    }

    /// Every setup name present in any track
    pub fn all_names(&self) -> BTreeSet<String> {
        self.tracks
            .values()
            .flat_map(|setups| setups.keys().cloned())
            .collect()
    }

    /// Iterator over all setups, track by track
    pub fn iter(&self) -> impl Iterator<Item = &SetupFile> {
        self.tracks.values().flat_map(|setups| setups.values())
    }

    /// Absolute path of a track folder
    pub fn track_path(&self, track: &str) -> PathBuf {
        self.path.join(track)
    }

    /// Absolute path of `name` inside `track`
    pub fn setup_path(&self, track: &str, name: &str) -> PathBuf {
        self.path.join(track).join(name)
    }

    /// Check if `path` lies inside this root
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }

    /// Return the number of setup copies in the root
    pub fn len(&self) -> usize {
        self.total_files
    }

    /// Check if no track holds any setup
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    /// Set the scan duration after scanning completes
    pub fn set_scan_duration(&mut self, duration: Duration) {
        self.scan_duration = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn setup(root: &SyncRoot, track: &str, name: &str, size: u64) -> SetupFile {
        SetupFile::new(
            track.to_string(),
            name.to_string(),
            root.setup_path(track, name),
            size,
            UNIX_EPOCH,
        )
    }

    #[test]
    fn test_new_root() {
        let root = SyncRoot::new(PathBuf::from("/setups"));

        assert!(root.is_empty());
        assert_eq!(root.len(), 0);
        assert_eq!(root.track_names().count(), 0);
    }

    #[test]
    fn test_insert_registers_track_and_updates_stats() {
        let mut root = SyncRoot::new(PathBuf::from("/setups"));
        let entry = setup(&root, "Monza", "a.json", 100);
        root.insert(entry);

        assert!(root.has_track("Monza"));
        assert!(root.contains("Monza", "a.json"));
        assert!(!root.contains("Spa", "a.json"));
        assert_eq!(root.total_size, 100);
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_duplicate_insertion_replaces_entry() {
        let mut root = SyncRoot::new(PathBuf::from("/setups"));
        let first = setup(&root, "Monza", "a.json", 100);
        let second = setup(&root, "Monza", "a.json", 250);
        root.insert(first);
        root.insert(second);

        assert_eq!(root.len(), 1);
        assert_eq!(root.total_size, 250);
        assert_eq!(root.get("Monza", "a.json").map(|s| s.size), Some(250));
    }

    #[test]
    fn test_all_names_spans_tracks() {
        let mut root = SyncRoot::new(PathBuf::from("/setups"));
        root.add_track("Zolder");
        let a = setup(&root, "Monza", "a.json", 1);
        let b = setup(&root, "Spa", "b.json", 1);
        let a_copy = setup(&root, "Spa", "a.json", 1);
        root.insert(a);
        root.insert(b);
        root.insert(a_copy);

        let names: Vec<_> = root.all_names().into_iter().collect();
        assert_eq!(names, vec!["a.json".to_string(), "b.json".to_string()]);
        assert_eq!(
            root.track_names().collect::<Vec<_>>(),
            vec!["Monza", "Spa", "Zolder"]
        );
        assert_eq!(root.iter().count(), 3);
    }

    #[test]
    fn test_paths() {
        let root = SyncRoot::new(PathBuf::from("/setups"));
        assert_eq!(root.track_path("Spa"), PathBuf::from("/setups/Spa"));
        assert_eq!(
            root.setup_path("Spa", "a.json"),
            PathBuf::from("/setups/Spa/a.json")
        );
        assert!(root.owns(Path::new("/setups/Spa/a.json")));
        assert!(!root.owns(Path::new("/other/Spa/a.json")));
    }
}
