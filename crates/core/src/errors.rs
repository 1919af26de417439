//! Comprehensive error types for the wckit core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    WorkingCopy(#[from] WorkingCopyError),

    #[error(transparent)]
    Changelist(#[from] ChangelistError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation was observed.
///
/// Kept as its own type so callers can distinguish "user cancelled" from a
/// real failure. Work already applied before the cancellation point is not
/// rolled back.
#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

// ---------------------------------------------------------------------------
// Working-copy access errors
// ---------------------------------------------------------------------------

/// Errors from opening, locking, or walking a working-copy scope.
#[derive(Debug, Error)]
pub enum WorkingCopyError {
    /// The path is not part of a versioned working copy.
    #[error("'{0}' is not a working copy")]
    NotWorkingCopy(PathBuf),

    /// The directory is already write-locked by another scope.
    #[error("working copy '{0}' is locked")]
    Locked(PathBuf),

    /// An admin area was requested for a directory that is not open in
    /// the current access scope.
    #[error("no admin area open for '{0}'")]
    AdminAreaMissing(PathBuf),

    /// A named entry does not exist in the directory's admin area.
    #[error("entry '{name}' not found in '{dir}'")]
    EntryNotFound {
        dir: PathBuf,
        name: String,
    },

    /// The access scope was used after `close()`.
    #[error("working copy access is closed")]
    Closed,

    /// The entry storage backend failed.
    #[error("entry store error: {0}")]
    Store(String),

    /// Cancellation observed mid-walk.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Generic I/O wrapper.
    #[error("working copy I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Changelist errors
// ---------------------------------------------------------------------------

/// Errors from changelist assignment and query operations.
#[derive(Debug, Error)]
pub enum ChangelistError {
    /// The target changelist name was an empty string. Rejected before any
    /// path is touched; pass `None` to clear membership instead.
    #[error("changelist name must not be empty")]
    EmptyChangelistName,

    /// The operation was cancelled between or during path walks.
    #[error(transparent)]
    Cancelled(Cancelled),

    /// Underlying working-copy access failure.
    #[error("changelist working copy error: {0}")]
    WorkingCopy(WorkingCopyError),
}

impl From<WorkingCopyError> for ChangelistError {
    fn from(err: WorkingCopyError) -> Self {
        // Cancellation keeps its own kind rather than being buried in the
        // working-copy variant.
        match err {
            WorkingCopyError::Cancelled(c) => ChangelistError::Cancelled(c),
            other => ChangelistError::WorkingCopy(other),
        }
    }
}

impl From<Cancelled> for ChangelistError {
    fn from(c: Cancelled) -> Self {
        ChangelistError::Cancelled(c)
    }
}

// ---------------------------------------------------------------------------
// Merge / conflict-resolution errors
// ---------------------------------------------------------------------------

/// Errors from the merge-result model and conflict-resolution callbacks.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A caller-supplied conflict handler failed; propagated verbatim to
    /// abort the enclosing merge or update operation.
    #[error("conflict resolution failed for '{path}': {detail}")]
    ResolverFailed {
        path: PathBuf,
        detail: String,
    },

    /// A resolution choice was applied to a conflict it cannot resolve
    /// (e.g. per-hunk choices on a binary file or property conflict).
    #[error("conflict choice '{choice}' is not applicable: {detail}")]
    InvalidChoice {
        choice: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Commit packet errors
// ---------------------------------------------------------------------------

/// Errors from commit item / packet bookkeeping.
#[derive(Debug, Error)]
pub enum CommitError {
    /// A skip-state lookup referenced an item the packet does not contain.
    #[error("commit item not found for '{0}'")]
    ItemNotFound(PathBuf),
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
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
