//! Lifecycle of a single conflicted file within one merge attempt.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::assembler::MergeDataAssembler;
use super::recorder::ConflictResolutionRecorder;
use crate::errors::SessionError;
use crate::models::MergeContentSet;

/// Where a conflicted file stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictState {
    /// Detected, content not loaded yet.
    Pending,
    /// Content handed to the caller, waiting for the user to merge.
    AwaitingUserResolution,
    /// Marked resolved in the backend.
    Resolved,
}

impl fmt::Display for ConflictState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::AwaitingUserResolution => write!(f, "awaiting_user_resolution"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// One conflicted file in one merge attempt.
///
/// A resolved session never goes back to pending; merging the same file
/// again starts a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSession {
    pub id: Uuid,
    pub root: PathBuf,
    pub file: PathBuf,
    state: ConflictState,
    pub started_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ConflictSession {
    /// Start a fresh session in the pending state.
    pub fn begin(root: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            root: root.into(),
            file: file.into(),
            state: ConflictState::Pending,
            started_at: Utc::now(),
            resolved_at: None,
        };
        debug!(id = %session.id, file = %session.file.display(), "conflict session started");
        session
    }

    pub fn state(&self) -> ConflictState {
        self.state
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Load merge content. Reloading while awaiting the user is allowed.
    pub fn load(
        &mut self,
        assembler: &MergeDataAssembler,
    ) -> Result<MergeContentSet, SessionError> {
        if self.state == ConflictState::Resolved {
            return Err(self.invalid(ConflictState::AwaitingUserResolution));
        }
        let content = assembler.load_merge_content(&self.root, &self.file)?;
        self.state = ConflictState::AwaitingUserResolution;
        Ok(content)
    }

    /// Mark the file resolved. Resolving a resolved session is a no-op.
    pub fn resolve(&mut self, recorder: &ConflictResolutionRecorder) -> Result<(), SessionError> {
        match self.state {
            ConflictState::Resolved => Ok(()),
            ConflictState::Pending => Err(self.invalid(ConflictState::Resolved)),
            ConflictState::AwaitingUserResolution => {
                recorder.mark_resolved(&self.root, &self.file)?;
                self.state = ConflictState::Resolved;
                self.resolved_at = Some(Utc::now());
                info!(id = %self.id, file = %self.file.display(), "conflict resolved");
                Ok(())
            }
        }
    }

    fn invalid(&self, to: ConflictState) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }
}
