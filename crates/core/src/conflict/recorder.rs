//! Marks conflicted files as resolved once the caller is done with them.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::backend::RevisionBackend;
use crate::errors::VcsError;

/// Records conflict resolution in the backend's merge metadata.
///
/// Marking a file twice is harmless. A file outside any known repository
/// root means the caller's own root detection went wrong; it is logged and
/// swallowed rather than shown to the user.
#[derive(Clone)]
pub struct ConflictResolutionRecorder {
    backend: Arc<dyn RevisionBackend>,
}

impl ConflictResolutionRecorder {
    pub fn new(backend: Arc<dyn RevisionBackend>) -> Self {
        Self { backend }
    }

    /// Look up the repository root of `file` and mark it resolved.
    pub fn conflict_resolved_for_file(&self, file: &Path) -> Result<(), VcsError> {
        match self.backend.repository_root(file) {
            Some(root) => self.mark_resolved(&root, file),
            None => {
                log_not_under_repository(file);
                Ok(())
            }
        }
    }

    /// Mark `file` under `root` as resolved.
    #[instrument(skip(self), fields(root = %root.display(), file = %file.display()))]
    pub fn mark_resolved(&self, root: &Path, file: &Path) -> Result<(), VcsError> {
        if !file.starts_with(root) {
            log_not_under_repository(file);
            return Ok(());
        }
        match self.backend.mark_resolved(root, file) {
            Ok(()) => {
                info!("marked file resolved");
                Ok(())
            }
            Err(VcsError::NotUnderRepository(_)) => {
                log_not_under_repository(file);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn log_not_under_repository(file: &Path) {
    error!(
        file = %file.display(),
        "couldn't mark file resolved, because it is not under a repository root"
    );
}
