//! mergebase core library.
//!
//! Three-way merge-base resolution and conflict-data assembly for a
//! distributed version-control integration: given a file under active
//! merge, work out which base, local, and incoming revisions to diff, fetch
//! their content, and record resolution once the caller is done. Head
//! merges against a chosen branch, tag, revision, or alternate head are
//! driven from [`merge::MergeTargetSelector`].
//!
//! The version-control tool itself sits behind [`backend::RevisionBackend`].

pub mod backend;
pub mod cancel;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod merge;
pub mod models;
pub mod notify;

// Re-exports for convenience.
pub use backend::{InMemoryBackend, LocalWorkingTree, RevisionBackend, WorkingTree};
pub use cancel::Cancellation;
pub use config::MergeConfig;
pub use conflict::{ConflictResolutionRecorder, ConflictSession, MergeDataAssembler};
pub use merge::{MergeTarget, MergeTargetSelector};
pub use models::{ConflictOutcome, MergeContentSet, RevisionId, RevisionPair};
