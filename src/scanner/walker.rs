//! Stack-based directory walker yielding file batches

use crate::config::SymlinkPolicy;
use crate::types::{FileEntry, WalkError};
use std::collections::{HashSet, VecDeque};
use std::fs::{self, DirEntry, ReadDir};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files per batch when the caller does not say otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Lazy, batched traversal of one or more roots.
///
/// Directories are kept on an explicit stack and listed one at a time, so
/// memory follows the widest directory seen rather than depth or total
/// file count. A batch never spans two roots.
///
/// Failures are yielded as `Err` items and the walk carries on: a directory
/// that cannot be listed drops its subtree only, an entry that cannot be
/// inspected drops that entry only.
pub struct TreeWalker {
    roots: VecDeque<PathBuf>,
    current: Option<RootWalk>,
    batch_size: usize,
    symlinks: SymlinkPolicy,
    deferred: Option<WalkError>,
}

impl TreeWalker {
    /// Walk a single root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_roots([root.into()])
    }

    /// Walk several roots one after the other. Relative paths are computed
    /// against the root each file was found under.
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            current: None,
            batch_size: DEFAULT_BATCH_SIZE,
            symlinks: SymlinkPolicy::default(),
            deferred: None,
        }
    }

    /// Set the number of files per batch (minimum 1)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the symlink policy
    pub fn symlinks(mut self, policy: SymlinkPolicy) -> Self {
        self.symlinks = policy;
        self
    }
}

impl Iterator for TreeWalker {
    type Item = Result<Vec<FileEntry>, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.deferred.take() {
            return Some(Err(err));
        }

        let mut batch = Vec::with_capacity(self.batch_size);

        loop {
            if batch.len() >= self.batch_size {
                return Some(Ok(batch));
            }

            if self.current.is_none() {
                match self.roots.pop_front() {
                    Some(root) => self.current = Some(RootWalk::new(root, self.symlinks)),
                    None => return (!batch.is_empty()).then_some(Ok(batch)),
                }
            }
            let Some(walk) = self.current.as_mut() else {
                continue;
            };

            match walk.next_step() {
                Step::File(entry) => batch.push(entry),
                Step::Failed(err) => {
                    if batch.is_empty() {
                        return Some(Err(err));
                    }
                    self.deferred = Some(err);
                    return Some(Ok(batch));
                }
                Step::Done => {
                    self.current = None;
                    if !batch.is_empty() {
                        return Some(Ok(batch));
                    }
                }
            }
        }
    }
}

enum Step {
    File(FileEntry),
    Failed(WalkError),
    Done,
}

/// Traversal state for one root
struct RootWalk {
    root: PathBuf,
    stack: Vec<PathBuf>,
    reading: Option<(PathBuf, ReadDir)>,
    policy: SymlinkPolicy,
    /// Canonical directories already queued; only tracked when following links
    visited: HashSet<PathBuf>,
}

impl RootWalk {
    fn new(root: PathBuf, policy: SymlinkPolicy) -> Self {
        let mut walk = Self {
            stack: Vec::new(),
            reading: None,
            policy,
            visited: HashSet::new(),
            root: root.clone(),
        };
        walk.push_dir(root);
        walk
    }

    fn next_step(&mut self) -> Step {
        loop {
            if let Some((dir, entries)) = self.reading.as_mut() {
                match entries.next() {
                    Some(Ok(dent)) => match self.visit(dent) {
                        Some(step) => return step,
                        None => continue,
                    },
                    Some(Err(source)) => {
                        let path = dir.clone();
                        self.reading = None;
                        return Step::Failed(WalkError::Directory { path, source });
                    }
                    None => {
                        self.reading = None;
                        continue;
                    }
                }
            }

            let Some(dir) = self.stack.pop() else {
                return Step::Done;
            };

            match fs::read_dir(&dir) {
                Ok(entries) => self.reading = Some((dir, entries)),
                Err(source) => return Step::Failed(WalkError::Directory { path: dir, source }),
            }
        }
    }

    /// Inspect one directory entry. Returns `None` when it produces nothing
    /// for the caller (a queued directory or an ignored special file).
    fn visit(&mut self, dent: DirEntry) -> Option<Step> {
        let path = dent.path();

        let file_type = match dent.file_type() {
            Ok(ft) => ft,
            Err(source) => return Some(self.entry_error(path, source)),
        };

        if file_type.is_symlink() {
            return self.visit_symlink(path);
        }

        if file_type.is_dir() {
            self.push_dir(path);
            return None;
        }

        if !file_type.is_file() {
            debug!(path = %path.display(), "skipping special file");
            return None;
        }

        match dent.metadata() {
            Ok(metadata) => Some(self.file_step(&path, &metadata)),
            Err(source) => Some(self.entry_error(path, source)),
        }
    }

    fn visit_symlink(&mut self, path: PathBuf) -> Option<Step> {
        if self.policy == SymlinkPolicy::Skip {
            debug!(path = %path.display(), "skipping symbolic link");
            return None;
        }

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {
                self.push_dir(path);
                None
            }
            Ok(metadata) if metadata.is_file() => Some(self.file_step(&path, &metadata)),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping broken symbolic link");
                None
            }
        }
    }

    fn push_dir(&mut self, dir: PathBuf) {
        if self.policy == SymlinkPolicy::Follow {
            // A canonical path seen twice means a link loops back on itself.
            let identity = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if !self.visited.insert(identity) {
                warn!(path = %dir.display(), "directory already visited, not following again");
                return;
            }
        }
        self.stack.push(dir);
    }

    fn file_step(&self, path: &Path, metadata: &fs::Metadata) -> Step {
        Step::File(FileEntry::from_metadata(path, &self.relative(path), metadata))
    }

    fn entry_error(&self, path: PathBuf, source: std::io::Error) -> Step {
        let relative = self.relative(&path);
        Step::Failed(WalkError::Entry {
            path,
            relative,
            source,
        })
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}
