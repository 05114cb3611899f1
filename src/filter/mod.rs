//! Exclude/include decisions from a relative path alone
//!
//! Both the transfer loop and the structure verifier consume the same
//! `PathFilter`, so the two passes can never disagree about scope.

use crate::types::{SkipReason, SyncError};
use crate::Config;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};

/// Compiled exclude and include rules
#[derive(Debug, Clone)]
pub struct PathFilter {
    exclude: GlobSet,
    /// `None` means everything not excluded is in scope
    include: Option<GlobSet>,
}

impl PathFilter {
    /// Compile exclude and include globs.
    ///
    /// Matching is case-insensitive and `*` crosses directory separators
    /// (`*.bad` matches `Saves/old/slot.bad`). Backslashes in patterns are
    /// read as separators.
    pub fn new(exclude: &[String], include: &[String]) -> Result<Self, SyncError> {
        let include = if include.is_empty() {
            None
        } else {
            Some(compile_patterns(include)?)
        };

        Ok(Self {
            exclude: compile_patterns(exclude)?,
            include,
        })
    }

    /// Build the filter described by a run configuration
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        Self::new(&config.exclude_patterns, &config.inclusion_patterns())
    }

    /// True when the path is blacklisted. Empty or non-relative paths are
    /// always excluded.
    pub fn exclude(&self, relative: &Path) -> bool {
        !is_plain_relative(relative) || self.exclude.is_match(relative)
    }

    /// True when the path is inside the inclusion set
    pub fn should_include(&self, relative: &Path) -> bool {
        if !is_plain_relative(relative) {
            return false;
        }
        match &self.include {
            None => true,
            Some(set) => set.is_match(relative),
        }
    }

    /// Skip reason for a path, or `None` when it is in scope.
    ///
    /// Exclusion is checked first, so a blacklisted file inside an included
    /// category still reports `Blacklisted`.
    pub fn classify(&self, relative: &Path) -> Option<SkipReason> {
        if self.exclude(relative) {
            Some(SkipReason::Blacklisted)
        } else if !self.should_include(relative) {
            Some(SkipReason::NotIncluded)
        } else {
            None
        }
    }

    /// Shorthand for `classify(..).is_none()`
    pub fn admits(&self, relative: &Path) -> bool {
        self.classify(relative).is_none()
    }
}

/// Compile a list of globs into one set
pub fn compile_patterns(patterns: &[String]) -> Result<GlobSet, SyncError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let normalized = normalize_pattern(pattern);
        let glob = GlobBuilder::new(&normalized)
            .case_insensitive(true)
            .literal_separator(false)
            .build()
            .map_err(|source| SyncError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }

    builder.build().map_err(|source| SyncError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

fn normalize_pattern(pattern: &str) -> String {
    let unified = pattern.trim().replace('\\', "/");
    unified
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

fn is_plain_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}
