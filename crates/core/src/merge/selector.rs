//! Runs a head merge for a chosen target and classifies the outcome.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, instrument, warn};

use super::target::MergeTarget;
use crate::backend::RevisionBackend;
use crate::cancel::Cancellation;
use crate::errors::{MergeError, VcsError};
use crate::models::{ConflictOutcome, RevisionId, UpdatedFiles};
use crate::notify::{
    NotificationSink, TITLE_MERGE_ERROR, TITLE_MERGE_EXCEPTION, TITLE_MERGE_WARNING,
    TITLE_MERGE_WARNINGS,
};

/// Post-merge pass that materializes conflicts for the files a merge
/// touched, so they can later be resolved one by one.
pub trait ConflictScanner: Send + Sync {
    fn scan(&self, root: &Path, updated: &UpdatedFiles) -> Result<(), VcsError>;
}

/// Scanner that remembers every conflicted file it has seen.
#[derive(Debug, Default)]
pub struct ConflictListScanner {
    conflicted: Mutex<Vec<PathBuf>>,
}

impl ConflictListScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conflicted files reported so far, in scan order.
    pub fn conflicted(&self) -> Vec<PathBuf> {
        self.conflicted
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }
}

impl ConflictScanner for ConflictListScanner {
    fn scan(&self, root: &Path, updated: &UpdatedFiles) -> Result<(), VcsError> {
        let mut files = self.conflicted.lock().map_err(|e| VcsError::CommandFailed {
            command: "resolve --list".into(),
            detail: format!("lock poisoned: {e}"),
        })?;
        for path in updated.conflicted() {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            debug!(file = %path.display(), "conflict recorded");
            files.push(path);
        }
        Ok(())
    }
}

/// Resolves merge targets and drives the backend's head merge.
pub struct MergeTargetSelector {
    backend: Arc<dyn RevisionBackend>,
    scanner: Arc<dyn ConflictScanner>,
    notifier: Arc<dyn NotificationSink>,
    cancellation: Cancellation,
}

impl MergeTargetSelector {
    pub fn new(
        backend: Arc<dyn RevisionBackend>,
        scanner: Arc<dyn ConflictScanner>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            backend,
            scanner,
            notifier,
            cancellation: Cancellation::default(),
        }
    }

    /// Check `cancellation` before each backend call.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The incoming revision for `target`. Never touches the backend.
    pub fn resolve_incoming(&self, target: &MergeTarget) -> Result<RevisionId, MergeError> {
        target.resolve_incoming()
    }

    /// Merge the working copy of `root` with `target`.
    ///
    /// Warning text from the merge is reported and the conflict scan still
    /// runs. A hard failure skips the scan. An invalid target never reaches
    /// the backend.
    ///
    /// Cancellation observed after the merge itself succeeded also skips the
    /// scan and yields an error outcome, even though the working copy has
    /// already been merged. Its conflicts are then not listed; the caller
    /// has to rescan the working copy.
    #[instrument(skip(self, target), fields(root = %root.display()))]
    pub fn merge_with(&self, root: &Path, target: &MergeTarget) -> ConflictOutcome {
        let request = match target.request() {
            Ok(request) => request,
            Err(e) => {
                let message = e.to_string();
                warn!(?target, "merge target has no incoming revision");
                self.notifier.notify_error(TITLE_MERGE_ERROR, &message);
                return ConflictOutcome::error(message);
            }
        };

        if let Err(e) = self.cancellation.check() {
            return ConflictOutcome::error(e.to_string());
        }

        info!(incoming = %request.incoming, selector = ?request.selector, "merging heads");
        let result = match self.backend.merge_heads(root, &request) {
            Ok(result) => result,
            Err(e) => return self.failed(&e),
        };

        let mut outcome = ConflictOutcome::clean();
        if !result.warnings.trim().is_empty() {
            warn!(warnings = %result.warnings, "merge finished with warnings");
            self.notifier
                .notify_warning(TITLE_MERGE_WARNINGS, &result.warnings);
            outcome.warnings.push(result.warnings.clone());
        }

        if let Err(e) = self.cancellation.check() {
            outcome.warnings.push(e.to_string());
            outcome.is_error = true;
            return outcome;
        }

        debug!(updated = result.updated_files.len(), "scanning merged files for conflicts");
        if let Err(e) = self.scanner.scan(root, &result.updated_files) {
            let failed = self.failed(&e);
            outcome.warnings.extend(failed.warnings);
            outcome.is_error |= failed.is_error;
        }
        outcome
    }

    fn failed(&self, e: &VcsError) -> ConflictOutcome {
        let message = e.to_string();
        if e.is_warning() {
            warn!(error = %message, "merge reported a warning");
            self.notifier.notify_warning(TITLE_MERGE_WARNING, &message);
            ConflictOutcome::warning(message)
        } else {
            warn!(error = %message, "merge failed");
            self.notifier.notify_error(TITLE_MERGE_EXCEPTION, &message);
            ConflictOutcome::error(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, MergeSelector, ScriptedMerge};
    use crate::models::{HeadMergeResult, UpdateKind};
    use crate::notify::{CollectingNotifier, NotificationLevel};

    struct Harness {
        backend: Arc<InMemoryBackend>,
        scanner: Arc<ConflictListScanner>,
        notifier: Arc<CollectingNotifier>,
        selector: MergeTargetSelector,
    }

    fn harness() -> Harness {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_repository("/repo").unwrap();
        let scanner = Arc::new(ConflictListScanner::new());
        let notifier = Arc::new(CollectingNotifier::new());
        let selector =
            MergeTargetSelector::new(backend.clone(), scanner.clone(), notifier.clone());
        Harness {
            backend,
            scanner,
            notifier,
            selector,
        }
    }

    struct FailingScanner;

    impl ConflictScanner for FailingScanner {
        fn scan(&self, _root: &Path, _updated: &UpdatedFiles) -> Result<(), VcsError> {
            Err(VcsError::CommandFailed {
                command: "resolve --list".into(),
                detail: "repository locked".into(),
            })
        }
    }

    #[test]
    fn test_resolve_incoming_makes_no_backend_call() {
        let h = harness();
        let target = MergeTarget::branch("release", RevisionId::changeset("R7"));
        assert_eq!(
            h.selector.resolve_incoming(&target).unwrap(),
            RevisionId::changeset("R7")
        );
        assert_eq!(h.backend.call_count(), 0);
    }

    #[test]
    fn test_clean_merge_scans_conflicts() {
        let h = harness();
        let mut updated = UpdatedFiles::new();
        updated.add(UpdateKind::Merged, "lib.rs");
        updated.add(UpdateKind::Conflicted, "a.txt");
        h.backend
            .script_merge(ScriptedMerge::Success(HeadMergeResult {
                warnings: String::new(),
                updated_files: updated,
            }))
            .unwrap();

        let outcome = h
            .selector
            .merge_with(Path::new("/repo"), &MergeTarget::revision("5"));
        assert!(outcome.is_clean());
        assert_eq!(h.scanner.conflicted(), vec![PathBuf::from("/repo/a.txt")]);

        let requests = h.backend.merge_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1.selector, MergeSelector::Revision("5".into()));
        assert_eq!(requests[0].1.incoming, RevisionId::local("5"));
    }

    #[test]
    fn test_warning_text_still_scans() {
        let h = harness();
        let mut updated = UpdatedFiles::new();
        updated.add(UpdateKind::Conflicted, "b.txt");
        h.backend
            .script_merge(ScriptedMerge::Success(HeadMergeResult {
                warnings: "3 files unresolved".into(),
                updated_files: updated,
            }))
            .unwrap();

        let outcome = h.selector.merge_with(
            Path::new("/repo"),
            &MergeTarget::branch("release", RevisionId::changeset("R7")),
        );
        assert_eq!(
            outcome,
            ConflictOutcome {
                warnings: vec!["3 files unresolved".into()],
                is_error: false,
            }
        );
        assert_eq!(h.scanner.conflicted().len(), 1);
        let entries = h.notifier.notifications();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, TITLE_MERGE_WARNINGS);
    }

    #[test]
    fn test_hard_failure_skips_scan() {
        let h = harness();
        h.backend
            .script_merge(ScriptedMerge::Failure("abort: outstanding uncommitted changes".into()))
            .unwrap();

        let outcome = h.selector.merge_with(
            Path::new("/repo"),
            &MergeTarget::alternate_head(RevisionId::changeset("h2")),
        );
        assert!(outcome.is_error);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("outstanding uncommitted changes"));
        assert!(h.scanner.conflicted().is_empty());
        assert_eq!(h.notifier.notifications()[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_backend_warning_error_is_not_fatal() {
        let h = harness();
        h.backend
            .script_merge(ScriptedMerge::Warning("branch merge in progress".into()))
            .unwrap();
        let outcome = h
            .selector
            .merge_with(Path::new("/repo"), &MergeTarget::revision("tip"));
        assert_eq!(outcome, ConflictOutcome::warning("branch merge in progress"));
        assert_eq!(h.notifier.notifications()[0].title, TITLE_MERGE_WARNING);
    }

    #[test]
    fn test_invalid_target_never_reaches_backend() {
        let h = harness();
        let target = MergeTarget::Branch {
            name: "default".into(),
            head: None,
        };
        let outcome = h.selector.merge_with(Path::new("/repo"), &target);
        assert_eq!(outcome, ConflictOutcome::error("invalid merge target"));
        assert_eq!(h.backend.call_count(), 0);
        assert_eq!(h.notifier.notifications()[0].title, TITLE_MERGE_ERROR);
    }

    #[test]
    fn test_scan_failure_is_an_error() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_repository("/repo").unwrap();
        let notifier = Arc::new(CollectingNotifier::new());
        let selector =
            MergeTargetSelector::new(backend.clone(), Arc::new(FailingScanner), notifier.clone());

        let outcome = selector.merge_with(Path::new("/repo"), &MergeTarget::revision("3"));
        assert!(outcome.is_error);
        assert!(outcome.warnings[0].contains("repository locked"));
    }

    /// Cancels the shared token when the merge reports warning text, i.e.
    /// after `merge_heads` returned and before the conflict scan.
    struct CancelOnWarning {
        cancellation: Cancellation,
        inner: CollectingNotifier,
    }

    impl NotificationSink for CancelOnWarning {
        fn notify_warning(&self, title: &str, body: &str) {
            self.inner.notify_warning(title, body);
            self.cancellation.cancel();
        }

        fn notify_error(&self, title: &str, body: &str) {
            self.inner.notify_error(title, body);
        }
    }

    #[test]
    fn test_cancelled_after_merge_skips_scan() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_repository("/repo").unwrap();
        let mut updated = UpdatedFiles::new();
        updated.add(UpdateKind::Conflicted, "a.txt");
        backend
            .script_merge(ScriptedMerge::Success(HeadMergeResult {
                warnings: "1 files unresolved".into(),
                updated_files: updated,
            }))
            .unwrap();
        let scanner = Arc::new(ConflictListScanner::new());
        let cancellation = Cancellation::new();
        let notifier = Arc::new(CancelOnWarning {
            cancellation: cancellation.clone(),
            inner: CollectingNotifier::new(),
        });
        let selector =
            MergeTargetSelector::new(backend.clone(), scanner.clone(), notifier.clone())
                .with_cancellation(cancellation);

        let outcome = selector.merge_with(Path::new("/repo"), &MergeTarget::revision("3"));

        assert!(outcome.is_error);
        assert_eq!(
            outcome.warnings,
            vec![
                "1 files unresolved".to_string(),
                VcsError::Cancelled.to_string()
            ]
        );
        assert_eq!(backend.merge_requests().len(), 1);
        assert!(scanner.conflicted().is_empty());
        assert_eq!(notifier.inner.notifications().len(), 1);
    }

    #[test]
    fn test_cancelled_merge_skips_backend() {
        let h = harness();
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let selector = h.selector.with_cancellation(cancellation);
        let outcome = selector.merge_with(Path::new("/repo"), &MergeTarget::revision("3"));
        assert!(outcome.is_error);
        assert_eq!(h.backend.call_count(), 0);
    }
}
