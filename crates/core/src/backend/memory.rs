//! In-memory revision backend for testing and embedding.
//!
//! [`InMemoryBackend`] keeps one revision DAG per repository root behind a
//! `RwLock`. Every changeset records the files it touched; file-level
//! parentage and ancestry are derived from that, the same way a
//! file-scoped history query would see them. Head merges are scripted.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::{AncestorScope, MergeRequest, RevisionBackend};
use crate::errors::VcsError;
use crate::models::{HeadMergeResult, RevisionId, RevisionPair};

/// Outcome returned by the next [`RevisionBackend::merge_heads`] call.
#[derive(Debug, Clone)]
pub enum ScriptedMerge {
    /// The merge ran; `warnings` may carry non-fatal text.
    Success(HeadMergeResult),
    /// The merge reported a warning through the error channel.
    Warning(String),
    /// The merge command failed.
    Failure(String),
}

/// One ancestor query as the backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorQueryRecord {
    pub scope: AncestorScope,
    pub a: RevisionId,
    pub b: RevisionId,
}

#[derive(Debug)]
struct Changeset {
    parents: Vec<String>,
    files: HashMap<PathBuf, Vec<u8>>,
    seq: usize,
}

#[derive(Debug, Default)]
struct Repository {
    changesets: HashMap<String, Changeset>,
    working_parents: Vec<String>,
    resolved: HashSet<PathBuf>,
}

#[derive(Debug, Default)]
struct State {
    repos: BTreeMap<PathBuf, Repository>,
    next_seq: usize,
    fail_ancestor_queries: bool,
    ancestor_queries: Vec<AncestorQueryRecord>,
    merges: VecDeque<ScriptedMerge>,
    merge_requests: Vec<(PathBuf, MergeRequest)>,
}

/// An in-memory implementation of [`RevisionBackend`].
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    /// Create a backend with no repositories.
    pub fn new() -> Self {
        Self::default()
    }

    // -- setup --------------------------------------------------------------

    /// Register an empty repository at `root`.
    pub fn add_repository(&self, root: impl Into<PathBuf>) -> Result<(), VcsError> {
        let root = root.into();
        debug!(root = %root.display(), "registering repository");
        self.write()?.repos.entry(root).or_default();
        Ok(())
    }

    /// Add a changeset `id` with the given parents that touches `files`
    /// (paths relative to `root`).
    pub fn commit<I, P, C>(
        &self,
        root: &Path,
        id: &str,
        parents: &[&str],
        files: I,
    ) -> Result<RevisionId, VcsError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<Path>,
        C: AsRef<[u8]>,
    {
        let mut state = self.write()?;
        let seq = state.next_seq;
        let repo = state
            .repos
            .get_mut(root)
            .ok_or_else(|| VcsError::NotUnderRepository(root.display().to_string()))?;

        if repo.changesets.contains_key(id) {
            return Err(VcsError::CommandFailed {
                command: "commit".into(),
                detail: format!("changeset {id} already exists"),
            });
        }
        if let Some(missing) = parents.iter().find(|p| !repo.changesets.contains_key(**p)) {
            return Err(VcsError::UnknownRevision((*missing).to_string()));
        }

        let files = files
            .into_iter()
            .map(|(path, content)| (path.as_ref().to_path_buf(), content.as_ref().to_vec()))
            .collect();
        repo.changesets.insert(
            id.to_string(),
            Changeset {
                parents: parents.iter().map(|p| p.to_string()).collect(),
                files,
                seq,
            },
        );
        state.next_seq += 1;
        Ok(RevisionId::changeset(id))
    }

    /// Set the working-directory parents of `root`.
    pub fn set_working_parents(&self, root: &Path, parents: &[&str]) -> Result<(), VcsError> {
        let mut state = self.write()?;
        let repo = state
            .repos
            .get_mut(root)
            .ok_or_else(|| VcsError::NotUnderRepository(root.display().to_string()))?;
        if let Some(missing) = parents.iter().find(|p| !repo.changesets.contains_key(**p)) {
            return Err(VcsError::UnknownRevision((*missing).to_string()));
        }
        repo.working_parents = parents.iter().map(|p| p.to_string()).collect();
        Ok(())
    }

    /// Queue the outcome of the next head merge. Unscripted merges succeed
    /// with no warnings and no updated files.
    pub fn script_merge(&self, merge: ScriptedMerge) -> Result<(), VcsError> {
        self.write()?.merges.push_back(merge);
        Ok(())
    }

    /// Make every subsequent ancestor query fail.
    pub fn fail_ancestor_queries(&self, fail: bool) -> Result<(), VcsError> {
        self.write()?.fail_ancestor_queries = fail;
        Ok(())
    }

    // -- inspection ---------------------------------------------------------

    /// Number of [`RevisionBackend`] calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ancestor_queries(&self) -> Vec<AncestorQueryRecord> {
        self.read()
            .map(|s| s.ancestor_queries.clone())
            .unwrap_or_default()
    }

    pub fn merge_requests(&self) -> Vec<(PathBuf, MergeRequest)> {
        self.read()
            .map(|s| s.merge_requests.clone())
            .unwrap_or_default()
    }

    pub fn is_resolved(&self, root: &Path, file: &Path) -> bool {
        let Ok(rel) = file.strip_prefix(root) else {
            return false;
        };
        self.read()
            .map(|s| s.repos.get(root).is_some_and(|r| r.resolved.contains(rel)))
            .unwrap_or(false)
    }

    // -- internals ----------------------------------------------------------

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, VcsError> {
        self.state.read().map_err(|e| VcsError::CommandFailed {
            command: "lock".into(),
            detail: format!("lock poisoned: {e}"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, VcsError> {
        self.state.write().map_err(|e| VcsError::CommandFailed {
            command: "lock".into(),
            detail: format!("lock poisoned: {e}"),
        })
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn ensure_under<'a>(root: &Path, file: &'a Path) -> Result<&'a Path, VcsError> {
    if file.starts_with(root) {
        Ok(file)
    } else {
        Err(VcsError::NotUnderRepository(file.display().to_string()))
    }
}

impl State {
    fn root_of(&self, path: &Path) -> Option<&Path> {
        self.repos
            .keys()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    fn locate<'a>(&'a self, path: &'a Path) -> Result<(&'a Repository, &'a Path), VcsError> {
        let root = self
            .root_of(path)
            .ok_or_else(|| VcsError::NotUnderRepository(path.display().to_string()))?;
        let repo = self
            .repos
            .get(root)
            .ok_or_else(|| VcsError::NotUnderRepository(path.display().to_string()))?;
        let rel = path
            .strip_prefix(root)
            .map_err(|_| VcsError::NotUnderRepository(path.display().to_string()))?;
        Ok((repo, rel))
    }
}

impl Repository {
    fn resolve(&self, rev: &RevisionId) -> Result<&str, VcsError> {
        self.changesets
            .get_key_value(rev.as_str())
            .map(|(k, _)| k.as_str())
            .ok_or_else(|| VcsError::UnknownRevision(rev.to_string()))
    }

    /// `start` and every changeset reachable through parent links.
    fn ancestors<'a>(&'a self, start: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some((key, cs)) = self.changesets.get_key_value(id) else {
                continue;
            };
            if seen.insert(key.as_str()) {
                stack.extend(cs.parents.iter().map(String::as_str));
            }
        }
        seen
    }

    /// Newest changeset in `candidates`, optionally restricted to those
    /// that touched `file`.
    fn newest<'a>(
        &'a self,
        candidates: impl IntoIterator<Item = &'a str>,
        file: Option<&Path>,
    ) -> Option<&'a str> {
        candidates
            .into_iter()
            .filter_map(|id| {
                let cs = self.changesets.get(id)?;
                match file {
                    Some(f) if !cs.files.contains_key(f) => None,
                    _ => Some((id, cs.seq)),
                }
            })
            .max_by_key(|(_, seq)| *seq)
            .map(|(id, _)| id)
    }

    /// The changeset holding the version of `file` seen from `start`.
    fn file_revision<'a>(&'a self, start: &'a str, file: &Path) -> Option<&'a str> {
        self.newest(self.ancestors(start), Some(file))
    }

    fn file_parents<'a>(&'a self, starts: impl Iterator<Item = &'a str>, file: &Path) -> RevisionPair {
        let mut unique: Vec<&str> = Vec::new();
        for id in starts.filter_map(|s| self.file_revision(s, file)) {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        let mut ids = unique.into_iter().map(RevisionId::changeset);
        RevisionPair::new(ids.next(), ids.next())
    }
}

impl RevisionBackend for InMemoryBackend {
    fn repository_root(&self, file: &Path) -> Option<PathBuf> {
        self.count_call();
        let state = self.read().ok()?;
        state.root_of(file).map(Path::to_path_buf)
    }

    fn parents(&self, root: &Path, file: &Path) -> Result<RevisionPair, VcsError> {
        self.count_call();
        let state = self.read()?;
        let (repo, rel) = state.locate(ensure_under(root, file)?)?;
        Ok(repo.file_parents(repo.working_parents.iter().map(String::as_str), rel))
    }

    fn parents_at(
        &self,
        root: &Path,
        file: &Path,
        revision: &RevisionId,
    ) -> Result<RevisionPair, VcsError> {
        self.count_call();
        let state = self.read()?;
        let (repo, rel) = state.locate(ensure_under(root, file)?)?;
        let start = repo.resolve(revision)?;
        let Some(file_rev) = repo.file_revision(start, rel) else {
            return Ok(RevisionPair::none());
        };
        let Some(cs) = repo.changesets.get(file_rev) else {
            return Ok(RevisionPair::none());
        };
        Ok(repo.file_parents(cs.parents.iter().map(String::as_str), rel))
    }

    fn ancestor_query(
        &self,
        scope: &AncestorScope,
        a: &RevisionId,
        b: &RevisionId,
    ) -> Result<Option<RevisionId>, VcsError> {
        self.count_call();
        let mut state = self.write()?;
        state.ancestor_queries.push(AncestorQueryRecord {
            scope: scope.clone(),
            a: a.clone(),
            b: b.clone(),
        });
        if state.fail_ancestor_queries {
            return Err(VcsError::CommandFailed {
                command: "log".into(),
                detail: format!("ancestor({a},{b}) could not be evaluated"),
            });
        }

        let (repo, rel) = state.locate(scope.path())?;
        let file = match scope {
            AncestorScope::File(_) => Some(rel),
            AncestorScope::Repository(_) => None,
        };
        let anc_a = repo.ancestors(repo.resolve(a)?);
        let anc_b = repo.ancestors(repo.resolve(b)?);
        let common = anc_a.intersection(&anc_b).copied();
        Ok(repo.newest(common, file).map(RevisionId::changeset))
    }

    fn fetch_content(&self, file: &Path, revision: &RevisionId) -> Result<Vec<u8>, VcsError> {
        self.count_call();
        let state = self.read()?;
        let (repo, rel) = state.locate(file)?;
        let unavailable = || VcsError::ContentUnavailable {
            path: file.display().to_string(),
            revision: revision.to_string(),
        };
        let start = repo.resolve(revision)?;
        let file_rev = repo.file_revision(start, rel).ok_or_else(unavailable)?;
        repo.changesets
            .get(file_rev)
            .and_then(|cs| cs.files.get(rel))
            .cloned()
            .ok_or_else(unavailable)
    }

    fn mark_resolved(&self, root: &Path, file: &Path) -> Result<(), VcsError> {
        self.count_call();
        let not_under = || VcsError::NotUnderRepository(file.display().to_string());
        let rel = file.strip_prefix(root).map_err(|_| not_under())?;
        let mut state = self.write()?;
        let repo = state.repos.get_mut(root).ok_or_else(not_under)?;
        repo.resolved.insert(rel.to_path_buf());
        Ok(())
    }

    fn merge_heads(
        &self,
        root: &Path,
        request: &MergeRequest,
    ) -> Result<HeadMergeResult, VcsError> {
        self.count_call();
        let mut state = self.write()?;
        if !state.repos.contains_key(root) {
            return Err(VcsError::NotUnderRepository(root.display().to_string()));
        }
        state
            .merge_requests
            .push((root.to_path_buf(), request.clone()));
        match state.merges.pop_front() {
            None => Ok(HeadMergeResult::default()),
            Some(ScriptedMerge::Success(result)) => Ok(result),
            Some(ScriptedMerge::Warning(msg)) => Err(VcsError::Warning(msg)),
            Some(ScriptedMerge::Failure(detail)) => Err(VcsError::CommandFailed {
                command: "merge".into(),
                detail,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/repo";

    fn root() -> &'static Path {
        Path::new(ROOT)
    }

    /// r0 -- r1 -- r2 (local)
    ///        \
    ///         r3 -- r4 (other)
    fn diverged() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.add_repository(ROOT).unwrap();
        backend.commit(root(), "r0", &[], [("a.txt", "base\n")]).unwrap();
        backend.commit(root(), "r1", &["r0"], [("other.txt", "x\n")]).unwrap();
        backend.commit(root(), "r2", &["r1"], [("a.txt", "local\n")]).unwrap();
        backend.commit(root(), "r3", &["r1"], [("a.txt", "theirs-1\n")]).unwrap();
        backend.commit(root(), "r4", &["r3"], [("a.txt", "theirs-2\n")]).unwrap();
        backend
    }

    #[test]
    fn test_repository_root_picks_longest_prefix() {
        let backend = InMemoryBackend::new();
        backend.add_repository("/work").unwrap();
        backend.add_repository("/work/nested").unwrap();
        assert_eq!(
            backend.repository_root(Path::new("/work/nested/a.txt")),
            Some(PathBuf::from("/work/nested"))
        );
        assert_eq!(
            backend.repository_root(Path::new("/work/b.txt")),
            Some(PathBuf::from("/work"))
        );
        assert_eq!(backend.repository_root(Path::new("/elsewhere/c.txt")), None);
    }

    #[test]
    fn test_working_parents_map_to_file_revisions() {
        let backend = diverged();
        backend.set_working_parents(root(), &["r2", "r4"]).unwrap();
        let pair = backend.parents(root(), Path::new("/repo/a.txt")).unwrap();
        assert_eq!(pair.first, Some(RevisionId::changeset("r2")));
        assert_eq!(pair.second, Some(RevisionId::changeset("r4")));

        // Only one side touched other.txt, so both parents collapse.
        let pair = backend.parents(root(), Path::new("/repo/other.txt")).unwrap();
        assert_eq!(pair, RevisionPair::single(RevisionId::changeset("r1")));
    }

    #[test]
    fn test_parents_of_unknown_file_are_empty() {
        let backend = diverged();
        backend.set_working_parents(root(), &["r2"]).unwrap();
        let pair = backend.parents(root(), Path::new("/repo/new.txt")).unwrap();
        assert_eq!(pair, RevisionPair::none());
    }

    #[test]
    fn test_parents_at_skips_changesets_that_did_not_touch_file() {
        let backend = diverged();
        let pair = backend
            .parents_at(root(), Path::new("/repo/a.txt"), &RevisionId::changeset("r2"))
            .unwrap();
        assert_eq!(pair, RevisionPair::single(RevisionId::changeset("r0")));
    }

    #[test]
    fn test_file_scope_and_repository_scope_differ() {
        let backend = diverged();
        let a = RevisionId::changeset("r2");
        let b = RevisionId::changeset("r4");

        let repo_base = backend
            .ancestor_query(&AncestorScope::Repository(PathBuf::from(ROOT)), &a, &b)
            .unwrap();
        assert_eq!(repo_base, Some(RevisionId::changeset("r1")));

        let file_base = backend
            .ancestor_query(&AncestorScope::File(PathBuf::from("/repo/a.txt")), &a, &b)
            .unwrap();
        assert_eq!(file_base, Some(RevisionId::changeset("r0")));

        assert_eq!(backend.ancestor_queries().len(), 2);
    }

    #[test]
    fn test_unrelated_roots_have_no_ancestor() {
        let backend = InMemoryBackend::new();
        backend.add_repository(ROOT).unwrap();
        backend.commit(root(), "x", &[], [("a.txt", "one\n")]).unwrap();
        backend.commit(root(), "y", &[], [("a.txt", "two\n")]).unwrap();
        let base = backend
            .ancestor_query(
                &AncestorScope::File(PathBuf::from("/repo/a.txt")),
                &RevisionId::changeset("x"),
                &RevisionId::changeset("y"),
            )
            .unwrap();
        assert_eq!(base, None);
    }

    #[test]
    fn test_fetch_content_follows_history() {
        let backend = diverged();
        let file = Path::new("/repo/a.txt");
        assert_eq!(
            backend.fetch_content(file, &RevisionId::changeset("r1")).unwrap(),
            b"base\n"
        );
        assert_eq!(
            backend.fetch_content(file, &RevisionId::changeset("r4")).unwrap(),
            b"theirs-2\n"
        );
        let err = backend
            .fetch_content(Path::new("/repo/missing.txt"), &RevisionId::changeset("r4"))
            .unwrap_err();
        assert!(matches!(err, VcsError::ContentUnavailable { .. }));
    }

    #[test]
    fn test_commit_rejects_unknown_parent() {
        let backend = InMemoryBackend::new();
        backend.add_repository(ROOT).unwrap();
        let err = backend
            .commit(root(), "r1", &["nope"], [("a.txt", "x")])
            .unwrap_err();
        assert!(matches!(err, VcsError::UnknownRevision(ref r) if r == "nope"));
    }

    #[test]
    fn test_scripted_merges_are_consumed_in_order() {
        let backend = diverged();
        backend
            .script_merge(ScriptedMerge::Warning("heads diverged".into()))
            .unwrap();
        let request = MergeRequest {
            selector: crate::backend::MergeSelector::Revision("r4".into()),
            incoming: RevisionId::changeset("r4"),
        };
        let err = backend.merge_heads(root(), &request).unwrap_err();
        assert!(err.is_warning());
        let ok = backend.merge_heads(root(), &request).unwrap();
        assert!(ok.updated_files.is_empty());
        assert_eq!(backend.merge_requests().len(), 2);
    }
}
