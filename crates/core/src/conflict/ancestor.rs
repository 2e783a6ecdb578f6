//! Common-ancestor lookup between two divergent revisions.
//!
//! Finding no ancestor is a valid answer: two files added independently and
//! later unified by a merge share no lineage. A failing query is reported
//! as a warning and treated the same way, because the merge can still go
//! ahead with an empty base.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::backend::{AncestorScope, RevisionBackend};
use crate::models::RevisionId;
use crate::notify::{NotificationSink, TITLE_ANCESTOR_QUERY};

/// Result of an ancestor lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorLookup {
    /// The nearest common ancestor, if one exists.
    pub ancestor: Option<RevisionId>,
    /// Set when the query itself failed.
    pub warning: Option<String>,
}

/// Locates merge bases through the backend's ancestor query.
#[derive(Clone)]
pub struct AncestorFinder {
    backend: Arc<dyn RevisionBackend>,
    notifier: Arc<dyn NotificationSink>,
}

impl AncestorFinder {
    pub fn new(backend: Arc<dyn RevisionBackend>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { backend, notifier }
    }

    /// Nearest common ancestor of `a` and `b` among the revisions that
    /// touched `file`.
    pub fn find_common_ancestor(
        &self,
        file: &Path,
        a: &RevisionId,
        b: &RevisionId,
    ) -> AncestorLookup {
        self.find_in_scope(&AncestorScope::File(file.to_path_buf()), a, b)
    }

    /// Nearest common ancestor of `a` and `b` within `scope`.
    #[instrument(skip(self), fields(scope = %scope, a = %a, b = %b))]
    pub fn find_in_scope(
        &self,
        scope: &AncestorScope,
        a: &RevisionId,
        b: &RevisionId,
    ) -> AncestorLookup {
        match self.backend.ancestor_query(scope, a, b) {
            Ok(Some(ancestor)) => {
                debug!(ancestor = %ancestor, "found common ancestor");
                AncestorLookup {
                    ancestor: Some(ancestor),
                    warning: None,
                }
            }
            Ok(None) => {
                debug!("no common ancestor");
                AncestorLookup::default()
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "ancestor query failed, continuing without a base");
                self.notifier.notify_warning(TITLE_ANCESTOR_QUERY, &message);
                AncestorLookup {
                    ancestor: None,
                    warning: Some(message),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::notify::{CollectingNotifier, NotificationLevel};

    fn setup() -> (Arc<InMemoryBackend>, Arc<CollectingNotifier>, AncestorFinder) {
        let backend = Arc::new(InMemoryBackend::new());
        let root = Path::new("/repo");
        backend.add_repository(root).unwrap();
        backend.commit(root, "a", &[], [("f.txt", "1\n")]).unwrap();
        backend.commit(root, "b", &["a"], [("f.txt", "2\n")]).unwrap();
        backend.commit(root, "c", &["a"], [("f.txt", "3\n")]).unwrap();
        backend.commit(root, "x", &[], [("f.txt", "unrelated\n")]).unwrap();
        let notifier = Arc::new(CollectingNotifier::new());
        let finder = AncestorFinder::new(backend.clone(), notifier.clone());
        (backend, notifier, finder)
    }

    #[test]
    fn test_finds_ancestor_in_file_scope() {
        let (backend, notifier, finder) = setup();
        let lookup = finder.find_common_ancestor(
            Path::new("/repo/f.txt"),
            &RevisionId::changeset("b"),
            &RevisionId::changeset("c"),
        );
        assert_eq!(lookup.ancestor, Some(RevisionId::changeset("a")));
        assert!(lookup.warning.is_none());
        assert!(notifier.notifications().is_empty());

        let queries = backend.ancestor_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].scope, AncestorScope::File("/repo/f.txt".into()));
    }

    #[test]
    fn test_unrelated_revisions_yield_none_without_warning() {
        let (_backend, notifier, finder) = setup();
        let lookup = finder.find_common_ancestor(
            Path::new("/repo/f.txt"),
            &RevisionId::changeset("b"),
            &RevisionId::changeset("x"),
        );
        assert_eq!(lookup, AncestorLookup::default());
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_query_failure_becomes_warning() {
        let (backend, notifier, finder) = setup();
        backend.fail_ancestor_queries(true).unwrap();
        let lookup = finder.find_common_ancestor(
            Path::new("/repo/f.txt"),
            &RevisionId::changeset("b"),
            &RevisionId::changeset("c"),
        );
        assert!(lookup.ancestor.is_none());
        assert!(lookup.warning.is_some());

        let entries = notifier.notifications();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, NotificationLevel::Warning);
        assert_eq!(entries[0].title, TITLE_ANCESTOR_QUERY);
    }
}
