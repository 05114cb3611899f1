//! Post-transfer structure check

use crate::config::SymlinkPolicy;
use crate::filter::PathFilter;
use crate::scanner::TreeWalker;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files present on only one side, relative to the roots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// In the source scope but absent from the destination
    pub missing: Vec<PathBuf>,
    /// In the destination scope but absent from the source
    pub extra: Vec<PathBuf>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Compares the set of in-scope relative paths on both sides.
///
/// Only existence is checked. The filter is the same one the transfer used,
/// so excluded files never show up as differences.
pub struct StructureVerifier<'a> {
    filter: &'a PathFilter,
    symlinks: SymlinkPolicy,
}

impl<'a> StructureVerifier<'a> {
    pub fn new(filter: &'a PathFilter) -> Self {
        Self {
            filter,
            symlinks: SymlinkPolicy::default(),
        }
    }

    pub fn symlinks(mut self, policy: SymlinkPolicy) -> Self {
        self.symlinks = policy;
        self
    }

    pub fn verify(&self, source: &Path, destination: &Path) -> VerificationReport {
        let source_set = self.collect(source);
        let destination_set = self.collect(destination);

        let mut missing: Vec<PathBuf> = source_set.difference(&destination_set).cloned().collect();
        let mut extra: Vec<PathBuf> = destination_set.difference(&source_set).cloned().collect();
        missing.sort();
        extra.sort();

        let report = VerificationReport { missing, extra };
        if report.is_clean() {
            info!(files = source_set.len(), "structure verified");
        } else {
            warn!(
                missing = report.missing.len(),
                extra = report.extra.len(),
                "structure differs between source and destination"
            );
        }
        report
    }

    fn collect(&self, root: &Path) -> HashSet<PathBuf> {
        let mut paths = HashSet::new();

        for batch in TreeWalker::new(root).symlinks(self.symlinks) {
            match batch {
                Ok(entries) => paths.extend(
                    entries
                        .into_iter()
                        .map(|entry| entry.relative)
                        .filter(|relative| self.filter.admits(relative)),
                ),
                Err(e) => warn!(path = %e.path().display(), error = %e, "verification walk error"),
            }
        }

        paths
    }
}
