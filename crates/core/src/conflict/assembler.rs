//! Three-way merge content assembly.
//!
//! For a file under merge the assembler decides which revisions play the
//! base, local, and incoming roles and fetches their bytes. There are two
//! cases, told apart by the number of parents of the file's current state:
//!
//! * **Committed merge** (two parents): parent one is local, parent two is
//!   incoming, and the base is their common ancestor within the file's own
//!   history. The file-level merge base can differ from the repository-wide
//!   one, so the query is always file-scoped.
//! * **Pending merge** (one parent): that parent is incoming, local edits
//!   are uncommitted and come from the pending-merge snapshot beside the
//!   file, and the base is incoming's own parent.
//!
//! When no base exists the merge is a divergent addition and the base
//! buffer is empty.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::ancestor::AncestorFinder;
use super::parents::ParentResolver;
use crate::backend::{RevisionBackend, WorkingTree};
use crate::cancel::Cancellation;
use crate::errors::VcsError;
use crate::models::{MergeContentSet, MergeRevisions, MergeState, RevisionId, RevisionPair};
use crate::notify::NotificationSink;

/// Revisions and local bytes chosen by one of the two code paths.
struct Sides {
    local_rev: Option<RevisionId>,
    local: Vec<u8>,
    incoming: RevisionId,
    base: Option<RevisionId>,
    warnings: Vec<String>,
}

/// Produces [`MergeContentSet`]s for conflicted files.
///
/// Calls for different files are independent. Calls for the same file must
/// be serialized by the caller since the pending-merge snapshot is shared.
pub struct MergeDataAssembler {
    backend: Arc<dyn RevisionBackend>,
    working_tree: Arc<dyn WorkingTree>,
    parents: ParentResolver,
    ancestors: AncestorFinder,
    cancellation: Cancellation,
}

impl MergeDataAssembler {
    pub fn new(
        backend: Arc<dyn RevisionBackend>,
        working_tree: Arc<dyn WorkingTree>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            parents: ParentResolver::new(backend.clone()),
            ancestors: AncestorFinder::new(backend.clone(), notifier),
            backend,
            working_tree,
            cancellation: Cancellation::default(),
        }
    }

    /// Check `cancellation` before every backend call.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Like [`load_merge_content`](Self::load_merge_content), looking up the
    /// repository root of `file` first.
    pub fn load_for_file(&self, file: &Path) -> Result<MergeContentSet, VcsError> {
        self.cancellation.check()?;
        let root = self
            .backend
            .repository_root(file)
            .ok_or_else(|| VcsError::NotUnderRepository(file.display().to_string()))?;
        self.load_merge_content(&root, file)
    }

    /// Assemble base, local, and incoming content for `file`.
    #[instrument(skip(self), fields(root = %root.display(), file = %file.display()))]
    pub fn load_merge_content(
        &self,
        root: &Path,
        file: &Path,
    ) -> Result<MergeContentSet, VcsError> {
        self.cancellation.check()?;
        let (state, parents) = self.parents.merge_state(root, file)?;
        info!(state = %state, "loading merge content");

        let sides = match state {
            MergeState::CommittedMerge => self.committed_sides(file, parents)?,
            MergeState::PendingMerge => self.pending_sides(root, file, parents)?,
        };

        let base = match &sides.base {
            Some(rev) => {
                self.cancellation.check()?;
                self.backend.fetch_content(file, rev)?
            }
            None => {
                debug!("no base revision, treating as divergent addition");
                Vec::new()
            }
        };

        self.cancellation.check()?;
        let incoming = self.backend.fetch_content(file, &sides.incoming)?;

        self.working_tree.refresh(file);

        debug!(
            base = ?sides.base,
            local = ?sides.local_rev,
            incoming = %sides.incoming,
            "merge content assembled"
        );
        Ok(MergeContentSet {
            base,
            local: sides.local,
            incoming,
            state,
            revisions: MergeRevisions {
                base: sides.base,
                local: sides.local_rev,
                incoming: sides.incoming,
            },
            warnings: sides.warnings,
        })
    }

    fn committed_sides(&self, file: &Path, parents: RevisionPair) -> Result<Sides, VcsError> {
        let (local_rev, incoming) = match parents {
            RevisionPair {
                first: Some(first),
                second: Some(second),
            } => (first, second),
            _ => {
                return Err(VcsError::NoParent(file.display().to_string()));
            }
        };

        self.cancellation.check()?;
        let local = self.backend.fetch_content(file, &local_rev)?;

        self.cancellation.check()?;
        let lookup = self
            .ancestors
            .find_common_ancestor(file, &local_rev, &incoming);

        Ok(Sides {
            local_rev: Some(local_rev),
            local,
            incoming,
            base: lookup.ancestor,
            warnings: lookup.warning.into_iter().collect(),
        })
    }

    fn pending_sides(
        &self,
        root: &Path,
        file: &Path,
        parents: RevisionPair,
    ) -> Result<Sides, VcsError> {
        let incoming = parents
            .first
            .ok_or_else(|| VcsError::NoParent(file.display().to_string()))?;

        self.cancellation.check()?;
        let base = self.parents.parents_at(root, file, &incoming)?.first;

        let local = match self.working_tree.read_pending_snapshot(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                info!(file = %file.display(), error = %e, "couldn't read pending-merge snapshot");
                Vec::new()
            }
        };

        Ok(Sides {
            local_rev: None,
            local,
            incoming,
            base,
            warnings: Vec::new(),
        })
    }
}
