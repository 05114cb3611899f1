//! Change detection between a source file and its destination

mod compare;

pub use compare::ChangeDetector;
