//! Atomic file copy implementation

use crate::types::SyncError;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use tempfile::{NamedTempFile, PersistError};

const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Staged copies are named `.simsync-XXXXXX.tmp` beside their destination
const STAGE_PREFIX: &str = ".simsync-";
const STAGE_SUFFIX: &str = ".tmp";

/// Make sure the parent directory of `dest` exists.
///
/// Returns `true` when this call created at least one directory. Another
/// worker creating the same directory first is not an error.
pub fn ensure_parent_dir(dest: &Path) -> io::Result<bool> {
    let Some(parent) = dest.parent() else {
        return Ok(false);
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(false);
    }

    match fs::create_dir_all(parent) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && parent.is_dir() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Write to a freshly created temporary file beside the destination
/// 2. Flush and sync to disk
/// 3. Preserve metadata (permissions, mtime)
/// 4. Rename over the final destination
///
/// The staging file is created exclusively under a random name, so it never
/// replaces an existing file, including a sibling of the destination. The
/// destination is never observed half-written. On failure the staging file
/// is removed and the previous destination, if any, is left intact.
///
/// A read-only destination is replaced only when `force` is set; otherwise
/// the copy fails with [`SyncError::PermissionDenied`].
///
/// # Example
/// ```no_run
/// use simsync::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(
///     Path::new("Saves/slot1.save"),
///     Path::new("/backup/Saves/slot1.save"),
///     false,
/// )?;
/// # Ok::<(), simsync::types::SyncError>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path, force: bool) -> Result<u64, SyncError> {
    // Prepare
    ensure_parent_dir(dest)?;
    release_read_only(dest, force)?;

    // Dropping the staged file on any error path deletes it.
    stage(src, stage_dir(dest))
        .and_then(|(staged, bytes)| commit(staged, dest).map(|()| bytes))
        .map_err(|e| map_copy_error(dest, e))
}

fn stage_dir(dest: &Path) -> &Path {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Stream `src` into a new staging file in `dir`, sync it, and stamp the
/// source metadata on it
fn stage(src: &Path, dir: &Path) -> io::Result<(NamedTempFile, u64)> {
    let mut src_file = File::open(src)?;
    let src_metadata = src_file.metadata()?;
    let mut staged = tempfile::Builder::new()
        .prefix(STAGE_PREFIX)
        .suffix(STAGE_SUFFIX)
        .tempfile_in(dir)?;

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        staged.as_file_mut().write_all(&buffer[..bytes_read])?;
        total_bytes += bytes_read as u64;
    }

    staged.as_file().sync_all()?;

    let mtime = src_metadata.modified()?;
    filetime::set_file_mtime(staged.path(), filetime::FileTime::from_system_time(mtime))?;
    staged.as_file().set_permissions(src_metadata.permissions())?;

    Ok((staged, total_bytes))
}

fn commit(staged: NamedTempFile, dest: &Path) -> io::Result<()> {
    match staged.persist(dest) {
        Ok(_) => Ok(()),
        // Windows refuses to rename over a read-only file.
        Err(PersistError { error, file })
            if error.kind() == ErrorKind::PermissionDenied && dest.exists() =>
        {
            fs::remove_file(dest)?;
            file.persist(dest).map(drop).map_err(|e| e.error)
        }
        Err(e) => Err(e.error),
    }
}

/// Clear the read-only bit on an existing destination when allowed to
fn release_read_only(dest: &Path, force: bool) -> Result<(), SyncError> {
    let metadata = match fs::symlink_metadata(dest) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SyncError::Io(e)),
    };

    let mut permissions = metadata.permissions();
    if !permissions.readonly() {
        return Ok(());
    }
    if !force {
        return Err(SyncError::PermissionDenied {
            path: dest.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);

    fs::set_permissions(dest, permissions)?;
    Ok(())
}

fn map_copy_error(dest: &Path, error: io::Error) -> SyncError {
    if error.kind() == ErrorKind::PermissionDenied {
        SyncError::PermissionDenied {
            path: dest.to_path_buf(),
        }
    } else {
        SyncError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staged_leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(STAGE_PREFIX))
            .collect()
    }

    #[test]
    fn test_stage_dir_for_bare_name() {
        assert_eq!(stage_dir(Path::new("slot1.save")), Path::new("."));
        assert_eq!(
            stage_dir(Path::new("/b/Saves/slot1.save")),
            Path::new("/b/Saves")
        );
    }

    #[test]
    fn test_ensure_parent_dir_reports_creation() {
        let temp = TempDir::new().expect("create temp dir");
        let dest = temp.path().join("Mods/a/b/file.package");

        assert!(ensure_parent_dir(&dest).expect("create parents"));
        assert!(temp.path().join("Mods/a/b").is_dir());
        assert!(!ensure_parent_dir(&dest).expect("already exists"));
    }

    #[test]
    fn test_ensure_parent_dir_blocked_by_file() {
        let temp = TempDir::new().expect("create temp dir");
        fs::write(temp.path().join("Mods"), b"not a dir").expect("write blocker");
        assert!(ensure_parent_dir(&temp.path().join("Mods/x.package")).is_err());
    }

    #[test]
    fn test_failed_copy_leaves_no_staging_file() {
        let temp = TempDir::new().expect("create temp dir");
        let dest = temp.path().join("out.save");

        let result = copy_file_atomic(&temp.path().join("missing.save"), &dest, false);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(staged_leftovers(temp.path()).is_empty());
    }
}
