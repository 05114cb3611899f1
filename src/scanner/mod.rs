//! Directory traversal

mod batch;
mod walker;

pub use batch::{resolve_batch_size, LARGE_TREE_BATCH_SIZE, LARGE_TREE_THRESHOLD};
pub use walker::{TreeWalker, DEFAULT_BATCH_SIZE};
