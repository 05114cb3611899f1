//! Configuration management

use super::types::SyncError;
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Files and folders that belong to one machine and must never travel.
///
/// Matched case-insensitively against the path relative to the source root.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/Config.log",
    "**/GameVersion.txt",
    "**/localthumbcache.package",
    "**/avatarcache.package",
    "**/ConfigOverride/**",
    "**/lastUI*.txt",
    "**/lastCrash*.txt",
    "*.bad",
    "**/.DS_Store",
    "**/Thumbs.db",
    "**/desktop.ini",
    "**/cache/**",
    "**/cachedata/**",
];

/// Named subsets of the user-data tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Save games
    Saves,
    /// Custom content and script mods
    Mods,
    /// User-generated lots, rooms and households
    Tray,
    /// Screenshots
    Screenshots,
    /// The game options file
    Options,
}

impl Category {
    /// Inclusion globs selecting this category
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Category::Saves => &["Saves/**"],
            Category::Mods => &["Mods/**"],
            Category::Tray => &["Tray/**"],
            Category::Screenshots => &["Screenshots/**"],
            Category::Options => &["Options.ini"],
        }
    }
}

/// How an existing destination file is compared with its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    /// Size and mtime only; a match is trusted without reading content
    Metadata,
    /// Metadata mismatch copies; a metadata match is confirmed by hash
    #[default]
    Verified,
    /// Equal sizes are always settled by hash, whatever the mtime says
    Content,
}

/// What the walker does with symbolic links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymlinkPolicy {
    /// Neither traverse nor copy links
    #[default]
    Skip,
    /// Follow links, visiting each real directory at most once
    Follow,
}

/// Global configuration for simsync
#[derive(Debug, Clone)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Dry run (classify everything, write nothing)
    pub dry_run: bool,

    /// Replace read-only destination files
    pub force: bool,

    /// Exclude patterns (globs, always win over includes)
    pub exclude_patterns: Vec<String>,

    /// Extra include patterns
    pub include_patterns: Vec<String>,

    /// Named subsets to restrict the run to
    pub categories: Vec<Category>,

    /// Number of concurrent copy workers
    pub max_parallel_jobs: usize,

    /// Files per traversal batch (None = size from tree estimate)
    pub batch_size: Option<usize>,

    /// Change detection policy
    pub compare_mode: CompareMode,

    /// Symlink traversal policy
    pub symlink_policy: SymlinkPolicy,

    /// Re-walk both trees after transfer and report differences
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            dry_run: false,
            force: false,
            exclude_patterns: DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect(),
            include_patterns: Vec::new(),
            categories: Vec::new(),
            max_parallel_jobs: 4,
            batch_size: None,
            compare_mode: CompareMode::default(),
            symlink_policy: SymlinkPolicy::default(),
            verify: true,
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.source.is_dir() {
            return Err(SyncError::SourceMissing {
                path: self.source.clone(),
            });
        }

        let source = resolve_path(&self.source);
        let destination = resolve_path(&self.destination);

        if source == destination {
            return Err(SyncError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }

        // The walker would pick up its own output otherwise.
        if destination.starts_with(&source) {
            return Err(SyncError::Config(format!(
                "Destination {:?} is inside source {:?}",
                self.destination, self.source
            )));
        }

        if self.max_parallel_jobs == 0 {
            return Err(SyncError::Config(
                "max_parallel_jobs must be at least 1".to_string(),
            ));
        }

        if self.batch_size == Some(0) {
            return Err(SyncError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Category globs followed by the explicit include patterns
    pub fn inclusion_patterns(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|c| c.patterns().iter().map(|p| p.to_string()))
            .chain(self.include_patterns.iter().cloned())
            .collect()
    }
}

/// Canonicalize the longest existing prefix and re-attach the rest.
fn resolve_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail: Vec<OsString> = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for component in tail.iter().rev() {
                resolved.push(component);
            }
            return resolved;
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Command-line interface
#[derive(Debug, Parser)]
#[command(name = "simsync", version, about = "Synchronize a game user-data folder, copying only what changed")]
pub struct Cli {
    /// Source user-data directory
    pub source: PathBuf,

    /// Destination directory (created if missing)
    pub destination: PathBuf,

    /// Classify every file but write nothing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Replace read-only destination files
    #[arg(short, long)]
    pub force: bool,

    /// Restrict the run to these categories
    #[arg(long, value_enum, value_delimiter = ',')]
    pub only: Vec<Category>,

    /// Extra include glob (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Exclude glob (repeatable); replaces the built-in exclude list
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Number of concurrent copy workers
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Files per traversal batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Change detection policy
    #[arg(long, value_enum)]
    pub compare: Option<CompareMode>,

    /// Follow symbolic links (cycles are detected and skipped)
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip the post-transfer structure check
    #[arg(long)]
    pub no_verify: bool,

    /// TOML file with default settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write log output to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Write the final report as JSON
    #[arg(long, value_name = "FILE")]
    pub summary_json: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let mut config = Config {
            source: cli.source,
            destination: cli.destination,
            dry_run: cli.dry_run,
            force: cli.force,
            ..Config::default()
        };

        if let Some(path) = &cli.config {
            FileConfig::load(path)?.apply(&mut config);
        }

        if !cli.exclude.is_empty() {
            config.exclude_patterns = cli.exclude;
        }
        if !cli.include.is_empty() {
            config.include_patterns = cli.include;
        }
        if !cli.only.is_empty() {
            config.categories = cli.only;
        }
        if let Some(jobs) = cli.jobs {
            config.max_parallel_jobs = jobs;
        }
        if cli.batch_size.is_some() {
            config.batch_size = cli.batch_size;
        }
        if let Some(mode) = cli.compare {
            config.compare_mode = mode;
        }
        if cli.follow_symlinks {
            config.symlink_policy = SymlinkPolicy::Follow;
        }
        if cli.no_verify {
            config.verify = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Settings read from a TOML file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub exclude: Option<Vec<String>>,
    pub include: Vec<String>,
    pub only: Vec<Category>,
    pub max_parallel_jobs: Option<usize>,
    pub batch_size: Option<usize>,
    pub compare: Option<CompareMode>,
    pub symlinks: Option<SymlinkPolicy>,
    pub verify: Option<bool>,
}

impl FileConfig {
    /// Read and parse a TOML settings file
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
            .map_err(|e| SyncError::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Overlay the values present in the file onto `config`
    pub fn apply(self, config: &mut Config) {
        if let Some(exclude) = self.exclude {
            config.exclude_patterns = exclude;
        }
        if !self.include.is_empty() {
            config.include_patterns = self.include;
        }
        if !self.only.is_empty() {
            config.categories = self.only;
        }
        if let Some(jobs) = self.max_parallel_jobs {
            config.max_parallel_jobs = jobs;
        }
        if self.batch_size.is_some() {
            config.batch_size = self.batch_size;
        }
        if let Some(mode) = self.compare {
            config.compare_mode = mode;
        }
        if let Some(policy) = self.symlinks {
            config.symlink_policy = policy;
        }
        if let Some(verify) = self.verify {
            config.verify = verify;
        }
    }
}
