//! Parent lookup for a file's working or historical state.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::backend::RevisionBackend;
use crate::errors::VcsError;
use crate::models::{MergeState, RevisionId, RevisionPair};

/// Read-only parent queries against a [`RevisionBackend`].
#[derive(Clone)]
pub struct ParentResolver {
    backend: Arc<dyn RevisionBackend>,
}

impl ParentResolver {
    pub fn new(backend: Arc<dyn RevisionBackend>) -> Self {
        Self { backend }
    }

    /// Parents of the working-copy state of `file`. A newly added file
    /// yields `(None, None)`. Backend failures propagate without retry.
    #[instrument(skip(self), fields(file = %file.display()))]
    pub fn parents(&self, root: &Path, file: &Path) -> Result<RevisionPair, VcsError> {
        let pair = self.backend.parents(root, file)?;
        debug!(first = ?pair.first, second = ?pair.second, "resolved working-copy parents");
        Ok(pair)
    }

    /// Parents of `file` as of `upper_bound` instead of the working copy.
    #[instrument(skip(self), fields(file = %file.display(), rev = %upper_bound))]
    pub fn parents_at(
        &self,
        root: &Path,
        file: &Path,
        upper_bound: &RevisionId,
    ) -> Result<RevisionPair, VcsError> {
        let pair = self.backend.parents_at(root, file, upper_bound)?;
        debug!(first = ?pair.first, second = ?pair.second, "resolved historical parents");
        Ok(pair)
    }

    /// Working-copy parents together with the merge state they imply.
    pub fn merge_state(
        &self,
        root: &Path,
        file: &Path,
    ) -> Result<(MergeState, RevisionPair), VcsError> {
        let pair = self.parents(root, file)?;
        Ok((MergeState::from_parents(&pair), pair))
    }
}
