use crate::config::Config;
use crate::scanner::walker::{TreeWalker, DEFAULT_BATCH_SIZE};
use std::path::Path;
use std::time::{Duration, Instant};

/// Trees with more files than this get the smaller batch size
pub const LARGE_TREE_THRESHOLD: usize = 10_000;

/// Batch size for large trees
pub const LARGE_TREE_BATCH_SIZE: usize = 20;

const PROBE_TIME_BUDGET: Duration = Duration::from_millis(500);

#[derive(Default, Debug, Clone, Copy)]
struct TreeShape {
    // Files counted before the probe stopped.
    files: usize,
    // Probe hit the threshold or ran out of time.
    truncated: bool,
}

/// Pick the traversal batch size for a run.
///
/// An explicit size in the configuration wins. Otherwise the source tree is
/// probed (up to the threshold or the time budget) and large trees get the
/// smaller batches.
pub fn resolve_batch_size(config: &Config, root: &Path) -> usize {
    if let Some(size) = config.batch_size {
        return size.max(1);
    }
    select_batch_size(probe_tree_shape(root, config))
}

fn select_batch_size(shape: TreeShape) -> usize {
    if shape.truncated || shape.files > LARGE_TREE_THRESHOLD {
        LARGE_TREE_BATCH_SIZE
    } else {
        DEFAULT_BATCH_SIZE
    }
}

fn probe_tree_shape(root: &Path, config: &Config) -> TreeShape {
    let walker = TreeWalker::new(root)
        .batch_size(DEFAULT_BATCH_SIZE)
        .symlinks(config.symlink_policy);

    let mut shape = TreeShape::default();
    let start = Instant::now();

    for batch in walker {
        // Errors are reported by the real pass.
        let Ok(batch) = batch else { continue };
        shape.files += batch.len();

        if shape.files > LARGE_TREE_THRESHOLD || start.elapsed() >= PROBE_TIME_BUDGET {
            shape.truncated = true;
            break;
        }
    }

    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_select_batch_size_small_tree() {
        let shape = TreeShape {
            files: 500,
            truncated: false,
        };
        assert_eq!(select_batch_size(shape), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_select_batch_size_large_tree() {
        let shape = TreeShape {
            files: LARGE_TREE_THRESHOLD + 1,
            truncated: false,
        };
        assert_eq!(select_batch_size(shape), LARGE_TREE_BATCH_SIZE);
    }

    #[test]
    fn test_select_batch_size_truncated_probe() {
        let shape = TreeShape {
            files: 300,
            truncated: true,
        };
        assert_eq!(select_batch_size(shape), LARGE_TREE_BATCH_SIZE);
    }

    #[test]
    fn test_resolve_respects_explicit_size() {
        let config = Config {
            batch_size: Some(7),
            ..Config::default()
        };
        assert_eq!(resolve_batch_size(&config, Path::new(".")), 7);
    }

    #[test]
    fn test_resolve_probes_small_tree() {
        let temp = TempDir::new().expect("create temp dir");
        for i in 0..12 {
            fs::write(temp.path().join(format!("f{i}.txt")), b"x").expect("write file");
        }
        let config = Config::default();
        assert_eq!(resolve_batch_size(&config, temp.path()), DEFAULT_BATCH_SIZE);
    }
}
