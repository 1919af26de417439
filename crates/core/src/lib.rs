//! wckit core library.
//!
//! This crate provides the working-copy side of an embedded Subversion-style
//! client: changelist membership management over a pluggable entry store,
//! the merge-outcome and conflict-description model consumed by conflict
//! resolution callbacks, commit item/packet bookkeeping, and runtime
//! configuration for the embedding host.

pub mod changelist;
pub mod commit;
pub mod config;
pub mod errors;
pub mod events;
pub mod merge;
pub mod types;
pub mod wc;

// Re-exports for convenience.
pub use changelist::ChangelistClient;
pub use commit::{CommitItem, CommitPacket};
pub use config::RuntimeConfig;
pub use errors::{Cancelled, ChangelistError, CoreError, WorkingCopyError};
pub use events::{EventAction, EventHandler, NullEventHandler, WcEvent};
pub use merge::{ConflictDescription, MergeResult, MergeStatus};
pub use types::{Depth, NodeKind, Revision};
