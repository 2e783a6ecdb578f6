//! Error types for the mergebase core library.
//!
//! Each concern has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`RevisionBackend`](crate::backend::RevisionBackend).
#[derive(Debug, Error)]
pub enum VcsError {
    /// A backend command exited unsuccessfully.
    #[error("{command} failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// The backend finished but reported a non-fatal condition.
    #[error("{0}")]
    Warning(String),

    /// The content of a file could not be produced for a revision.
    #[error("content of '{path}' is not available at revision {revision}")]
    ContentUnavailable { path: String, revision: String },

    /// The file does not belong to any known repository root.
    #[error("'{0}' is not under a known repository root")]
    NotUnderRepository(String),

    /// The file has no parent revision to take incoming content from.
    #[error("'{0}' has no parent revision to merge with")]
    NoParent(String),

    /// A revision identifier could not be found in the history.
    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    /// The caller cancelled the operation between two backend calls.
    #[error("operation cancelled")]
    Cancelled,

    /// Generic I/O wrapper.
    #[error("vcs I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    /// Whether this error describes a recoverable, warning-level condition.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

// ---------------------------------------------------------------------------
// Merge errors
// ---------------------------------------------------------------------------

/// Errors from selecting and running a head merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// No incoming revision could be derived from the merge target.
    #[error("invalid merge target")]
    InvalidTarget,

    /// Backend failure while merging.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

/// Errors from driving a [`ConflictSession`](crate::conflict::ConflictSession).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested transition is not allowed from the current state.
    #[error("invalid conflict state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Backend failure while loading or resolving.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
