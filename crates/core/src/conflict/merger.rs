//! Automatic merge preview over an assembled [`MergeContentSet`].
//!
//! Uses `diffy`'s line-based three-way merge to tell the caller whether the
//! three buffers reconcile cleanly before it opens an interactive merge.

use tracing::debug;

use crate::models::MergeContentSet;

const CONFLICT_START: &[u8] = b"<<<<<<<";

/// Whether `content` looks binary: a NUL byte within the first
/// `probe_len` bytes.
pub fn is_binary(content: &[u8], probe_len: usize) -> bool {
    content.iter().take(probe_len).any(|b| *b == 0)
}

/// Outcome of attempting an automatic three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePreview {
    /// The sides reconcile without conflicts.
    Clean(Vec<u8>),
    /// Conflicting regions remain; `merged` carries the markers.
    Conflicted { merged: Vec<u8>, conflicts: usize },
    /// At least one side is binary and cannot be line-merged.
    Binary,
}

impl MergePreview {
    pub fn compute(content: &MergeContentSet, probe_len: usize) -> Self {
        if content.is_binary(probe_len) {
            debug!("binary content, skipping line merge");
            return Self::Binary;
        }

        let MergeContentSet {
            base,
            local,
            incoming,
            ..
        } = content;

        if local == base || local == incoming {
            return Self::Clean(incoming.clone());
        }
        if incoming == base {
            return Self::Clean(local.clone());
        }

        match diffy::merge_bytes(base, local, incoming) {
            Ok(merged) => {
                debug!("three-way merge is clean");
                Self::Clean(merged)
            }
            Err(merged) => {
                let conflicts = count_conflicts(&merged);
                debug!(conflicts, "three-way merge has conflicts");
                Self::Conflicted { merged, conflicts }
            }
        }
    }

    pub fn has_conflicts(&self) -> bool {
        matches!(self, Self::Conflicted { .. })
    }

    /// Merged bytes, if the content could be line-merged.
    pub fn merged(&self) -> Option<&[u8]> {
        match self {
            Self::Clean(merged) | Self::Conflicted { merged, .. } => Some(merged.as_slice()),
            Self::Binary => None,
        }
    }
}

fn count_conflicts(merged: &[u8]) -> usize {
    merged
        .split(|b| *b == b'\n')
        .filter(|line| line.starts_with(CONFLICT_START))
        .count()
}
