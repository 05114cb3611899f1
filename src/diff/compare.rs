//! File comparison logic

use crate::config::CompareMode;
use crate::hash::files_match;
use crate::types::{FileEntry, SkipReason, SyncError, TransferDecision};

/// Decides whether a source file must be copied over its destination.
///
/// Two tiers:
///
/// 1. **Metadata**: size and modification time, no I/O.
/// 2. **Content**: Blake3 digests of both files, streamed.
///
/// Which tier settles the question depends on the [`CompareMode`]. A
/// modification time that went backwards still counts as a difference:
/// an older save replacing a newer one is a legitimate restore.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    mode: CompareMode,
}

impl ChangeDetector {
    pub fn new(mode: CompareMode) -> Self {
        Self { mode }
    }

    /// Compare a source entry with the destination entry at the same
    /// relative path (`None` when the destination does not exist).
    ///
    /// Only reads file content when the mode calls for the hash tier.
    pub fn decide(
        &self,
        source: &FileEntry,
        destination: Option<&FileEntry>,
    ) -> Result<TransferDecision, SyncError> {
        let Some(destination) = destination else {
            return Ok(TransferDecision::Copy);
        };

        let identical = match self.mode {
            CompareMode::Metadata => source.metadata_matches(destination),
            CompareMode::Verified => {
                source.metadata_matches(destination)
                    && files_match(&source.path, &destination.path)?
            }
            CompareMode::Content => {
                source.size == destination.size && files_match(&source.path, &destination.path)?
            }
        };

        Ok(if identical {
            TransferDecision::Skip(SkipReason::Identical)
        } else {
            TransferDecision::Copy
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    // Entries pointing at paths that do not exist: any attempt to hash them
    // would fail, which proves the metadata tier settled the decision.
    fn phantom(name: &str, size: u64, mtime_secs: u64) -> FileEntry {
        FileEntry::new(
            Path::new("/nonexistent").join(name),
            name.into(),
            size,
            UNIX_EPOCH + Duration::from_secs(mtime_secs),
        )
    }

    fn real(dir: &TempDir, name: &str, content: &[u8], mtime_secs: u64) -> FileEntry {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write file");
        let mtime = UNIX_EPOCH + Duration::from_secs(mtime_secs);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(mtime))
            .expect("set mtime");
        let metadata = fs::metadata(&path).expect("stat file");
        FileEntry::from_metadata(&path, Path::new(name), &metadata)
    }

    #[test]
    fn test_missing_destination_copies() {
        for mode in [CompareMode::Metadata, CompareMode::Verified, CompareMode::Content] {
            let decision = ChangeDetector::new(mode)
                .decide(&phantom("a.save", 10, 1), None)
                .expect("decide");
            assert_eq!(decision, TransferDecision::Copy);
        }
    }

    #[test]
    fn test_size_mismatch_copies_without_hashing() {
        for mode in [CompareMode::Metadata, CompareMode::Verified, CompareMode::Content] {
            let decision = ChangeDetector::new(mode)
                .decide(&phantom("a.save", 10, 1), Some(&phantom("b.save", 20, 1)))
                .expect("size mismatch needs no I/O");
            assert_eq!(decision, TransferDecision::Copy);
        }
    }

    #[test]
    fn test_mtime_mismatch_copies_either_direction() {
        let detector = ChangeDetector::new(CompareMode::Verified);
        let newer = phantom("a.save", 10, 2_000);
        let older = phantom("b.save", 10, 1_000);

        assert_eq!(
            detector.decide(&newer, Some(&older)).expect("decide"),
            TransferDecision::Copy
        );
        assert_eq!(
            detector.decide(&older, Some(&newer)).expect("decide"),
            TransferDecision::Copy
        );
    }

    #[test]
    fn test_metadata_mode_trusts_matching_metadata() {
        let detector = ChangeDetector::new(CompareMode::Metadata);
        let decision = detector
            .decide(&phantom("a.save", 10, 1_000), Some(&phantom("b.save", 10, 1_000)))
            .expect("metadata mode must not hash");
        assert_eq!(decision, TransferDecision::Skip(SkipReason::Identical));
    }

    #[test]
    fn test_verified_mode_confirms_with_hash() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        let detector = ChangeDetector::default();

        let same_src = real(&src, "same.save", b"payload", 1_000);
        let same_dst = real(&dst, "same.save", b"payload", 1_000);
        assert_eq!(
            detector.decide(&same_src, Some(&same_dst)).expect("decide"),
            TransferDecision::Skip(SkipReason::Identical)
        );

        // Same size and mtime, different bytes.
        let forged_src = real(&src, "forged.save", b"payload", 1_000);
        let forged_dst = real(&dst, "forged.save", b"PAYLOAD", 1_000);
        assert_eq!(
            detector.decide(&forged_src, Some(&forged_dst)).expect("decide"),
            TransferDecision::Copy
        );
    }

    #[test]
    fn test_content_mode_ignores_mtime() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        let detector = ChangeDetector::new(CompareMode::Content);

        let a = real(&src, "touched.save", b"payload", 5_000);
        let b = real(&dst, "touched.save", b"payload", 1_000);
        assert_eq!(
            detector.decide(&a, Some(&b)).expect("decide"),
            TransferDecision::Skip(SkipReason::Identical)
        );
    }

    #[test]
    fn test_hash_failure_is_reported() {
        let detector = ChangeDetector::new(CompareMode::Verified);
        let result = detector.decide(
            &phantom("a.save", 10, 1_000),
            Some(&phantom("b.save", 10, 1_000)),
        );
        assert!(matches!(result, Err(SyncError::Hash { .. })));
    }
}
