//! Domain model types shared by the resolver, assembler, and merge selector.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

/// Opaque identifier for a point in history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RevisionId {
    /// A committed changeset known to the backend.
    Changeset(String),
    /// A revision typed by the user that has not been resolved to a
    /// committed changeset. Never equal to any `Changeset`.
    Local(String),
}

impl RevisionId {
    pub fn changeset(id: impl Into<String>) -> Self {
        Self::Changeset(id.into())
    }

    pub fn local(id: impl Into<String>) -> Self {
        Self::Local(id.into())
    }

    /// Textual form handed to the backend.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Changeset(id) | Self::Local(id) => id,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parentage of a file state. `second` is only present for merges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionPair {
    pub first: Option<RevisionId>,
    pub second: Option<RevisionId>,
}

impl RevisionPair {
    pub fn new(first: Option<RevisionId>, second: Option<RevisionId>) -> Self {
        Self { first, second }
    }

    /// A pair with a single parent.
    pub fn single(first: RevisionId) -> Self {
        Self {
            first: Some(first),
            second: None,
        }
    }

    /// A pair with no parents, as reported for newly added files.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_merge(&self) -> bool {
        self.second.is_some()
    }
}

// ---------------------------------------------------------------------------
// Merge state and content
// ---------------------------------------------------------------------------

/// How the file under merge relates to its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    /// Two parents: the merge is already part of the working state.
    CommittedMerge,
    /// One parent: local edits are uncommitted and live in the pending-merge
    /// snapshot.
    PendingMerge,
}

impl MergeState {
    pub fn from_parents(parents: &RevisionPair) -> Self {
        if parents.is_merge() {
            Self::CommittedMerge
        } else {
            Self::PendingMerge
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommittedMerge => write!(f, "committed_merge"),
            Self::PendingMerge => write!(f, "pending_merge"),
        }
    }
}

/// The revisions chosen for each side of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRevisions {
    /// `None` when no common ancestor exists.
    pub base: Option<RevisionId>,
    /// `None` when local content came from the pending-merge snapshot.
    pub local: Option<RevisionId>,
    pub incoming: RevisionId,
}

/// The three buffers for a three-way merge of one file.
///
/// `base` is empty (never absent) when the two sides share no ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeContentSet {
    pub base: Vec<u8>,
    pub local: Vec<u8>,
    pub incoming: Vec<u8>,
    pub state: MergeState,
    pub revisions: MergeRevisions,
    /// Soft warnings collected while assembling.
    pub warnings: Vec<String>,
}

impl MergeContentSet {
    /// Whether the merge is a divergent addition with no shared base.
    ///
    /// A base that is missing only because the ancestor query failed does
    /// not count; that case carries a warning instead.
    pub fn is_divergent_add(&self) -> bool {
        self.revisions.base.is_none() && self.warnings.is_empty()
    }

    /// Whether any side looks like binary content.
    pub fn is_binary(&self, probe_len: usize) -> bool {
        [&self.base, &self.local, &self.incoming]
            .iter()
            .any(|buf| crate::conflict::is_binary(buf, probe_len))
    }
}

// ---------------------------------------------------------------------------
// Head merge results
// ---------------------------------------------------------------------------

/// How a file was touched by a head merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Updated,
    Merged,
    Conflicted,
    Created,
    Removed,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated => write!(f, "updated"),
            Self::Merged => write!(f, "merged"),
            Self::Conflicted => write!(f, "conflicted"),
            Self::Created => write!(f, "created"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Files reported by the backend as touched by a merge, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedFiles {
    groups: BTreeMap<UpdateKind, Vec<PathBuf>>,
}

impl UpdatedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: UpdateKind, path: impl Into<PathBuf>) {
        self.groups.entry(kind).or_default().push(path.into());
    }

    pub fn files(&self, kind: UpdateKind) -> &[PathBuf] {
        self.groups.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn conflicted(&self) -> &[PathBuf] {
        self.files(UpdateKind::Conflicted)
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (UpdateKind, &PathBuf)> {
        self.groups
            .iter()
            .flat_map(|(kind, paths)| paths.iter().map(move |p| (*kind, p)))
    }
}

/// Result of the backend's head-merge command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadMergeResult {
    /// Non-fatal message text; empty or whitespace when the merge was clean.
    pub warnings: String,
    pub updated_files: UpdatedFiles,
}

// ---------------------------------------------------------------------------
// Conflict outcome
// ---------------------------------------------------------------------------

/// Classification of a merge attempt, consumed immediately by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictOutcome {
    pub warnings: Vec<String>,
    pub is_error: bool,
}

impl ConflictOutcome {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            warnings: vec![message.into()],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            warnings: vec![message.into()],
            is_error: true,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.is_error && self.warnings.is_empty()
    }
}
