//! Change detection integration tests
//!
//! Entries come from the real walker so the decisions see the same
//! metadata a sync run would.

use simsync::config::CompareMode;
use simsync::diff::ChangeDetector;
use simsync::scanner::TreeWalker;
use simsync::{FileEntry, SkipReason, TransferDecision};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

// ═══════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════

fn write_with_mtime(root: &Path, relative: &str, content: &[u8], mtime_secs: u64) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("has parent")).expect("create parent dirs");
    fs::write(&path, content).expect("write file");
    let mtime = UNIX_EPOCH + Duration::from_secs(mtime_secs);
    filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(mtime))
        .expect("set mtime");
}

fn walk(root: &Path) -> HashMap<PathBuf, FileEntry> {
    TreeWalker::new(root)
        .filter_map(Result::ok)
        .flatten()
        .map(|entry| (entry.relative.clone(), entry))
        .collect()
}

fn decisions(
    mode: CompareMode,
    src: &Path,
    dst: &Path,
) -> HashMap<PathBuf, TransferDecision> {
    let detector = ChangeDetector::new(mode);
    let destination = walk(dst);

    walk(src)
        .into_iter()
        .map(|(relative, entry)| {
            let decision = detector
                .decide(&entry, destination.get(&relative))
                .expect("decide");
            (relative, decision)
        })
        .collect()
}

fn fixture() -> (TempDir, TempDir) {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");

    // New file
    write_with_mtime(src.path(), "Saves/new.save", b"fresh", 1_000);
    // Unchanged
    write_with_mtime(src.path(), "Saves/same.save", b"same-bytes", 1_000);
    write_with_mtime(dst.path(), "Saves/same.save", b"same-bytes", 1_000);
    // Edited in place, size unchanged
    write_with_mtime(src.path(), "Saves/edited.save", b"version-2", 2_000);
    write_with_mtime(dst.path(), "Saves/edited.save", b"version-1", 1_000);
    // Touched: content identical, mtime differs
    write_with_mtime(src.path(), "Mods/touched.package", b"package", 5_000);
    write_with_mtime(dst.path(), "Mods/touched.package", b"package", 1_000);
    // Restored older save over a newer one
    write_with_mtime(src.path(), "Saves/restored.save", b"older", 1_000);
    write_with_mtime(dst.path(), "Saves/restored.save", b"newer", 9_000);
    // Grown file
    write_with_mtime(src.path(), "Tray/lot.trayitem", b"bigger-lot", 1_000);
    write_with_mtime(dst.path(), "Tray/lot.trayitem", b"lot", 1_000);

    (src, dst)
}

const COPY: TransferDecision = TransferDecision::Copy;
const SAME: TransferDecision = TransferDecision::Skip(SkipReason::Identical);

// ═══════════════════════════════════════════════════════════
// Decision Tests
// ═══════════════════════════════════════════════════════════

#[test]
fn test_verified_mode_decisions() {
    let (src, dst) = fixture();
    let d = decisions(CompareMode::Verified, src.path(), dst.path());

    assert_eq!(d[Path::new("Saves/new.save")], COPY);
    assert_eq!(d[Path::new("Saves/same.save")], SAME);
    assert_eq!(d[Path::new("Saves/edited.save")], COPY);
    assert_eq!(d[Path::new("Mods/touched.package")], COPY);
    assert_eq!(d[Path::new("Saves/restored.save")], COPY);
    assert_eq!(d[Path::new("Tray/lot.trayitem")], COPY);
}

#[test]
fn test_metadata_mode_decisions() {
    let (src, dst) = fixture();
    let d = decisions(CompareMode::Metadata, src.path(), dst.path());

    assert_eq!(d[Path::new("Saves/same.save")], SAME);
    assert_eq!(d[Path::new("Mods/touched.package")], COPY);
    assert_eq!(d[Path::new("Saves/restored.save")], COPY);
}

#[test]
fn test_content_mode_skips_touched_files() {
    let (src, dst) = fixture();
    let d = decisions(CompareMode::Content, src.path(), dst.path());

    assert_eq!(d[Path::new("Saves/same.save")], SAME);
    assert_eq!(d[Path::new("Mods/touched.package")], SAME);
    assert_eq!(d[Path::new("Saves/edited.save")], COPY);
    assert_eq!(d[Path::new("Tray/lot.trayitem")], COPY);
}

#[test]
fn test_metadata_mode_misses_forged_content() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write_with_mtime(src.path(), "Saves/slot.save", b"AAAA", 1_000);
    write_with_mtime(dst.path(), "Saves/slot.save", b"BBBB", 1_000);

    let fast = decisions(CompareMode::Metadata, src.path(), dst.path());
    let safe = decisions(CompareMode::Verified, src.path(), dst.path());

    assert_eq!(fast[Path::new("Saves/slot.save")], SAME);
    assert_eq!(safe[Path::new("Saves/slot.save")], COPY);
}
