//! Hashing utilities

use crate::types::SyncError;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute Blake3 hash of a file
///
/// The file is streamed in 64KB chunks, so memory use does not depend on
/// file size.
///
/// # Example
/// ```no_run
/// use simsync::hash::compute_hash;
/// use std::path::Path;
///
/// let hash = compute_hash(Path::new("Saves/slot1.save"))?;
/// # Ok::<(), simsync::types::SyncError>(())
/// ```
pub fn compute_hash(file_path: &Path) -> Result<[u8; 32], SyncError> {
    hash_file(file_path).map_err(|source| SyncError::Hash {
        path: file_path.to_path_buf(),
        source,
    })
}

fn hash_file(file_path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(file_path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// True when both files hash to the same digest
pub fn files_match(a: &Path, b: &Path) -> Result<bool, SyncError> {
    Ok(compute_hash(a)? == compute_hash(b)?)
}
