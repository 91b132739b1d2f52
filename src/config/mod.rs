//! Configuration management

use crate::types::{DeleteMode, SyncError};
use clap::{ArgAction, Parser, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Track folders of Assetto Corsa Competizione
pub const ACC_TRACKS: &[&str] = &[
    "Barcelona",
    "brands_hatch",
    "Hungaroring",
    "Kyalami",
    "Laguna_Seca",
    "misano",
    "monza",
    "mount_panorama",
    "nurburgring",
    "Paul_Ricard",
    "Silverstone",
    "Spa",
    "Suzuka",
    "Zandvoort",
    "Zolder",
];

/// Default self-origin suppression window
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// How the root directory is organised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<root>/<track>/<setup>`
    #[default]
    Tracks,

    /// `<root>/<car>/<track>/<setup>`, each car synchronized on its own
    Cars,
}

impl Layout {
    /// Depth of setup files below the top-level path
    pub fn setup_depth(self) -> usize {
        match self {
            Layout::Tracks => 2,
            Layout::Cars => 3,
        }
    }
}

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "setupsync")]
#[command(about = "Copy setups to every track folder and keep them in sync", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Setups folder (one subfolder per track, or per car with --layout cars)
    pub root: PathBuf,

    /// Rename existing setups to unique names and copy them to every track, then exit
    #[arg(short, long)]
    pub init: bool,

    /// Keep watching after --init
    #[arg(short, long)]
    pub watch: bool,

    /// With --init: show what would be done without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Directory layout below ROOT
    #[arg(long, value_enum)]
    pub layout: Option<Layout>,

    /// What to do with copies of a deleted setup
    #[arg(long, value_enum)]
    pub delete_mode: Option<DeleteMode>,

    /// Setup file names to ignore (glob, repeatable)
    #[arg(short, long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Track folders that must exist (repeatable)
    #[arg(short, long = "track", value_name = "NAME")]
    pub track: Vec<String>,

    /// Require every ACC track folder
    #[arg(long)]
    pub acc_tracks: bool,

    /// Window in which events on paths we just wrote are ignored
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Settings read from a TOML file; command-line flags take precedence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub layout: Option<Layout>,
    pub delete_mode: Option<DeleteMode>,
    pub exclude: Vec<String>,
    pub tracks: Vec<String>,
    pub settle_ms: Option<u64>,
}

impl FileConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self, SyncError> {
        toml::from_str(text).map_err(|e| SyncError::Config(format!("Invalid config file: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self, SyncError> {
        let text = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }
}

/// Global configuration for setupsync
#[derive(Debug, Clone)]
pub struct Config {
    /// Top-level setups folder
    pub root: PathBuf,

    /// Run the initial copier
    pub init: bool,

    /// Run the watcher (after the copier when `init` is set)
    pub watch: bool,

    /// Dry run (show plan, don't execute)
    pub dry_run: bool,

    /// Directory layout below `root`
    pub layout: Layout,

    /// How to handle propagated deletes
    pub delete_mode: DeleteMode,

    /// Exclude patterns (globs on setup file names)
    pub exclude_patterns: Vec<String>,

    /// Track folders that must exist in every root
    pub required_tracks: Vec<String>,

    /// Self-origin suppression window
    pub watch_settle: Duration,

    /// Log verbosity (0 = info)
    pub verbose: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            init: false,
            watch: false,
            dry_run: false,
            layout: Layout::Tracks,
            delete_mode: DeleteMode::Trash,
            exclude_patterns: Vec::new(),
            required_tracks: Vec::new(),
            watch_settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            verbose: 0,
        }
    }
}

impl Config {
    /// Configuration for `root` with every other setting at its default
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Whether the initial copier runs
    pub fn runs_init(&self) -> bool {
        self.init
    }

    /// Whether the watcher runs; it is the default mode
    pub fn runs_watch(&self) -> bool {
        self.watch || !self.init
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.root.exists() {
            return Err(SyncError::Config(format!(
                "Root path does not exist: {:?}",
                self.root
            )));
        }

        if !self.root.is_dir() {
            return Err(SyncError::Config(format!(
                "Root path is not a directory: {:?}",
                self.root
            )));
        }

        if self.dry_run && !self.init {
            return Err(SyncError::Config(
                "--dry-run only applies together with --init".to_string(),
            ));
        }

        for track in &self.required_tracks {
            if track.is_empty()
                || track.starts_with('.')
                || track.contains(['/', '\\'])
                || track == ".."
            {
                return Err(SyncError::Config(format!("Invalid track name: {:?}", track)));
            }
        }

        self.exclude_matcher()?;
        Ok(())
    }

    /// Compile the exclude patterns
    pub fn exclude_matcher(&self) -> Result<GlobSet, SyncError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                SyncError::Config(format!("Invalid exclude pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build exclude patterns: {}", e)))
    }

    /// Merge command-line arguments over an optional file configuration
    pub fn from_parts(cli: Cli, file: FileConfig) -> Self {
        let mut required_tracks = file.tracks;
        if cli.acc_tracks {
            required_tracks.extend(ACC_TRACKS.iter().map(|t| t.to_string()));
        }
        required_tracks.extend(cli.track);
        required_tracks.sort();
        required_tracks.dedup();

        let mut exclude_patterns = file.exclude;
        exclude_patterns.extend(cli.exclude);

        let settle_ms = cli
            .settle_ms
            .or(file.settle_ms)
            .unwrap_or(DEFAULT_SETTLE_MS);

        Self {
            root: cli.root,
            init: cli.init,
            watch: cli.watch,
            dry_run: cli.dry_run,
            layout: cli.layout.or(file.layout).unwrap_or_default(),
            delete_mode: cli.delete_mode.or(file.delete_mode).unwrap_or_default(),
            exclude_patterns,
            required_tracks,
            watch_settle: Duration::from_millis(settle_ms),
            verbose: cli.verbose,
        }
    }
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let config = Config::from_parts(cli, file);
        config.validate()?;
        Ok(config)
    }
}
