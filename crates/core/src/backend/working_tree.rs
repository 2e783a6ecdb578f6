//! Working-tree access for merges in progress.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::MergeSettings;

/// On-disk state of a file being merged.
pub trait WorkingTree: Send + Sync {
    /// Bytes of the pending-merge snapshot kept beside `file`.
    fn read_pending_snapshot(&self, file: &Path) -> io::Result<Vec<u8>>;

    /// Make the caller's view of `file` match what is on disk.
    fn refresh(&self, file: &Path);
}

/// Working tree backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalWorkingTree {
    snapshot_suffix: String,
}

impl LocalWorkingTree {
    pub fn new(snapshot_suffix: impl Into<String>) -> Self {
        Self {
            snapshot_suffix: snapshot_suffix.into(),
        }
    }

    pub fn from_settings(settings: &MergeSettings) -> Self {
        Self::new(settings.pending_snapshot_suffix.clone())
    }

    /// Path of the snapshot for `file`: the file name with the suffix appended.
    pub fn snapshot_path(&self, file: &Path) -> PathBuf {
        let mut name = file.as_os_str().to_os_string();
        name.push(&self.snapshot_suffix);
        PathBuf::from(name)
    }
}

impl Default for LocalWorkingTree {
    fn default() -> Self {
        Self::from_settings(&MergeSettings::default())
    }
}

impl WorkingTree for LocalWorkingTree {
    fn read_pending_snapshot(&self, file: &Path) -> io::Result<Vec<u8>> {
        let path = self.snapshot_path(file);
        debug!(snapshot = %path.display(), "reading pending-merge snapshot");
        std::fs::read(path)
    }

    fn refresh(&self, file: &Path) {
        // Reads go straight to disk, so there is no cached view to drop.
        debug!(file = %file.display(), exists = file.exists(), "refreshed file");
    }
}
