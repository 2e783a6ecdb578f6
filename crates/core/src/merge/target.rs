//! Merge targets picked by the user.

use serde::{Deserialize, Serialize};

use crate::backend::{MergeRequest, MergeSelector};
use crate::errors::MergeError;
use crate::models::RevisionId;

/// What to merge the working copy with. Exactly one kind per merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeTarget {
    /// A named branch and its head, if known.
    Branch {
        name: String,
        head: Option<RevisionId>,
    },
    /// A tag and the revision it points at, if known.
    Tag {
        name: String,
        head: Option<RevisionId>,
    },
    /// A revision typed by the user.
    ExplicitRevision { revision: String },
    /// Another head of the current branch.
    AlternateHead { head: RevisionId },
}

impl MergeTarget {
    pub fn branch(name: impl Into<String>, head: RevisionId) -> Self {
        Self::Branch {
            name: name.into(),
            head: Some(head),
        }
    }

    pub fn tag(name: impl Into<String>, head: RevisionId) -> Self {
        Self::Tag {
            name: name.into(),
            head: Some(head),
        }
    }

    pub fn revision(revision: impl Into<String>) -> Self {
        Self::ExplicitRevision {
            revision: revision.into(),
        }
    }

    pub fn alternate_head(head: RevisionId) -> Self {
        Self::AlternateHead { head }
    }

    /// The revision that becomes the incoming side. Pure; fails only when
    /// the target carries no revision at all.
    pub fn resolve_incoming(&self) -> Result<RevisionId, MergeError> {
        match self {
            Self::Branch { head, .. } | Self::Tag { head, .. } => {
                head.clone().ok_or(MergeError::InvalidTarget)
            }
            Self::ExplicitRevision { revision } => {
                let revision = revision.trim();
                if revision.is_empty() {
                    Err(MergeError::InvalidTarget)
                } else {
                    Ok(RevisionId::local(revision))
                }
            }
            Self::AlternateHead { head } => Ok(head.clone()),
        }
    }

    /// How the backend's merge command should name this target.
    pub fn selector(&self) -> MergeSelector {
        match self {
            Self::Branch { name, .. } => MergeSelector::Branch(name.clone()),
            Self::Tag { name, .. } => MergeSelector::Revision(name.clone()),
            Self::ExplicitRevision { revision } => {
                MergeSelector::Revision(revision.trim().to_string())
            }
            Self::AlternateHead { head } => MergeSelector::Revision(head.as_str().to_string()),
        }
    }

    /// Full backend request, or [`MergeError::InvalidTarget`].
    pub fn request(&self) -> Result<MergeRequest, MergeError> {
        Ok(MergeRequest {
            incoming: self.resolve_incoming()?,
            selector: self.selector(),
        })
    }
}
