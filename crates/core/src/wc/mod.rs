//! Working-copy access layer.
//!
//! This module is the seam between the changelist/commit machinery and the
//! embedding host's administrative metadata: entry records ([`Entry`]),
//! pluggable storage ([`EntryStore`]), exclusive access scopes
//! ([`WcAccess`]/[`AdminArea`]), and the depth-driven entry walk.

pub mod access;
pub mod entry;
pub mod store;
pub mod util;
pub mod walker;

pub use access::{AdminArea, WcAccess};
pub use entry::{Entry, EntryChanges, Schedule, THIS_DIR};
pub use store::{EntryStore, JsonStore, MemoryStore, STORE_DIR};
pub use util::{find_wc_root, is_working_copy_root};
pub use walker::{walk_entries, EntryHandler};
