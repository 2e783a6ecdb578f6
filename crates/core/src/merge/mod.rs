//! Head merges: choosing the incoming revision and classifying the result.

pub mod selector;
pub mod target;

pub use selector::{ConflictListScanner, ConflictScanner, MergeTargetSelector};
pub use target::MergeTarget;
