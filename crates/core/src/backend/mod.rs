//! Collaborators the merge engine talks to.
//!
//! [`RevisionBackend`] wraps the version-control tool itself (parent lookup,
//! ancestor queries, content fetch, resolve marking, head merge). It is
//! provided by the integration layer; [`memory::InMemoryBackend`] is a
//! self-contained implementation over an in-memory revision DAG.
//! [`WorkingTree`] covers the on-disk side of a merge in progress.

pub mod memory;
pub mod working_tree;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::VcsError;
use crate::models::{HeadMergeResult, RevisionId, RevisionPair};

pub use memory::{InMemoryBackend, ScriptedMerge};
pub use working_tree::{LocalWorkingTree, WorkingTree};

// ---------------------------------------------------------------------------
// Query and request types
// ---------------------------------------------------------------------------

/// Which history an ancestor query may consider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "path", rename_all = "snake_case")]
pub enum AncestorScope {
    /// Only revisions that touched this file.
    File(PathBuf),
    /// The whole repository rooted here.
    Repository(PathBuf),
}

impl AncestorScope {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(p) | Self::Repository(p) => p,
        }
    }
}

impl fmt::Display for AncestorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "file:{}", p.display()),
            Self::Repository(p) => write!(f, "repo:{}", p.display()),
        }
    }
}

/// How the backend's merge command names the incoming head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum MergeSelector {
    /// Merge with the head of a named branch.
    Branch(String),
    /// Merge with a revision expression (tag name, number, or hash).
    Revision(String),
}

/// A head-merge invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub selector: MergeSelector,
    /// The revision that will become the incoming side of each conflict.
    pub incoming: RevisionId,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Version-control operations consumed by the merge engine.
///
/// All calls are synchronous and may block on an external process. Paths
/// are absolute working-tree paths.
pub trait RevisionBackend: Send + Sync {
    /// The repository root that owns `file`, if any.
    fn repository_root(&self, file: &Path) -> Option<PathBuf>;

    /// Parents of the working-copy state of `file`. A newly added file
    /// reports `(None, None)`.
    fn parents(&self, root: &Path, file: &Path) -> Result<RevisionPair, VcsError>;

    /// Parents of `file` as of `revision`.
    fn parents_at(
        &self,
        root: &Path,
        file: &Path,
        revision: &RevisionId,
    ) -> Result<RevisionPair, VcsError>;

    /// Nearest common ancestor of `a` and `b` within `scope`. `Ok(None)`
    /// means the revisions share no lineage.
    fn ancestor_query(
        &self,
        scope: &AncestorScope,
        a: &RevisionId,
        b: &RevisionId,
    ) -> Result<Option<RevisionId>, VcsError>;

    /// Content of `file` at `revision`.
    fn fetch_content(&self, file: &Path, revision: &RevisionId) -> Result<Vec<u8>, VcsError>;

    /// Record `file` as resolved in the backend's merge metadata.
    fn mark_resolved(&self, root: &Path, file: &Path) -> Result<(), VcsError>;

    /// Merge the working copy of `root` with another head.
    fn merge_heads(&self, root: &Path, request: &MergeRequest)
        -> Result<HeadMergeResult, VcsError>;
}
