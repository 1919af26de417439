//! Working-copy access scopes.
//!
//! A [`WcAccess`] opens admin areas for the directories an operation touches,
//! holding write locks for the duration of the scope. Locks are released by
//! [`WcAccess::close`] on every exit path; `Drop` is the backstop so a scope
//! abandoned by an early return or a cancellation cannot leak its locks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{Cancelled, WorkingCopyError};
use crate::events::{EventHandler, WcEvent};
use crate::types::Depth;
use crate::wc::entry::{Entry, EntryChanges};
use crate::wc::store::EntryStore;

// ---------------------------------------------------------------------------
// Admin area
// ---------------------------------------------------------------------------

/// Handle on one versioned directory's administrative metadata.
///
/// Reads and writes go straight through to the [`EntryStore`]; the store is
/// the single source of truth, so an area never caches entries.
pub struct AdminArea {
    dir: PathBuf,
    store: Arc<dyn EntryStore>,
}

impl AdminArea {
    pub(crate) fn new(dir: PathBuf, store: Arc<dyn EntryStore>) -> Self {
        Self { dir, store }
    }

    /// The directory this area administers.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All entries of this directory, self-entry first. Hidden entries are
    /// filtered unless `show_hidden` is set.
    pub fn entries(&self, show_hidden: bool) -> Result<Vec<Entry>, WorkingCopyError> {
        let entries = self.store.read_entries(&self.dir)?;
        // BTreeMap ordering puts the empty-named self-entry first.
        Ok(entries
            .into_values()
            .filter(|e| show_hidden || !e.hidden)
            .collect())
    }

    /// Look up one entry by name.
    pub fn entry(&self, name: &str) -> Result<Option<Entry>, WorkingCopyError> {
        let entries = self.store.read_entries(&self.dir)?;
        Ok(entries.get(name).cloned())
    }

    /// Apply a typed modification to a named entry and return the updated
    /// record. This is the only mutation primitive the admin area exposes.
    pub fn modify_entry(
        &self,
        name: &str,
        changes: &EntryChanges,
    ) -> Result<Entry, WorkingCopyError> {
        let mut entry = self
            .entry(name)?
            .ok_or_else(|| WorkingCopyError::EntryNotFound {
                dir: self.dir.clone(),
                name: name.to_string(),
            })?;

        if let Some(ref changelist) = changes.changelist {
            entry.changelist = changelist.clone();
        }

        debug!(
            dir = %self.dir.display(),
            entry = name,
            changelist = ?entry.changelist,
            "modifying entry"
        );
        self.store.write_entry(&self.dir, entry.clone())?;
        Ok(entry)
    }
}

// ---------------------------------------------------------------------------
// Access scope
// ---------------------------------------------------------------------------

/// An open working-copy access scope.
pub struct WcAccess {
    store: Arc<dyn EntryStore>,
    handler: Option<Arc<dyn EventHandler>>,
    open: BTreeMap<PathBuf, AdminArea>,
    locked: Vec<PathBuf>,
    closed: bool,
}

impl WcAccess {
    /// Create a scope over `store` with no event handler.
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            handler: None,
            open: BTreeMap::new(),
            locked: Vec::new(),
            closed: false,
        }
    }

    /// Create a scope that dispatches events to `handler` and polls it for
    /// cancellation.
    pub fn with_event_handler(store: Arc<dyn EntryStore>, handler: Arc<dyn EventHandler>) -> Self {
        let mut access = Self::new(store);
        access.handler = Some(handler);
        access
    }

    pub fn event_handler(&self) -> Option<&Arc<dyn EventHandler>> {
        self.handler.as_ref()
    }

    pub(crate) fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Poll the event handler for cancellation.
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        match &self.handler {
            Some(handler) => handler.check_cancelled(),
            None => Ok(()),
        }
    }

    /// Dispatch a lifecycle event to the scope's handler, if any.
    /// Fire-and-forget.
    pub fn dispatch_event(&self, event: &WcEvent) {
        if let Some(handler) = &self.handler {
            handler.handle_event(event);
        }
    }

    /// Open the admin area for `path`, probing upward when `path` is a file:
    /// the area opened is then the parent directory's. Returns the directory
    /// whose area anchors the scope.
    ///
    /// With `write_lock`, every opened directory is exclusively locked for
    /// the lifetime of the scope. `Depth::Infinity` opens the whole subtree;
    /// shallower depths open only the anchor (child directories are read
    /// through their parent's entries).
    pub fn probe_open(
        &mut self,
        path: &Path,
        write_lock: bool,
        depth: Depth,
    ) -> Result<PathBuf, WorkingCopyError> {
        if self.closed {
            return Err(WorkingCopyError::Closed);
        }

        let dir = if self.store.is_versioned(path) {
            path.to_path_buf()
        } else {
            let parent = path
                .parent()
                .ok_or_else(|| WorkingCopyError::NotWorkingCopy(path.to_path_buf()))?;
            if !self.store.is_versioned(parent) {
                return Err(WorkingCopyError::NotWorkingCopy(path.to_path_buf()));
            }
            parent.to_path_buf()
        };

        self.open_dir(&dir, write_lock, depth == Depth::Infinity)?;
        debug!(anchor = %dir.display(), write_lock, %depth, "opened working copy scope");
        Ok(dir)
    }

    fn open_dir(
        &mut self,
        dir: &Path,
        write_lock: bool,
        recurse: bool,
    ) -> Result<(), WorkingCopyError> {
        if self.open.contains_key(dir) {
            return Ok(());
        }

        if write_lock {
            self.store.try_lock(dir)?;
            self.locked.push(dir.to_path_buf());
        }
        self.open.insert(
            dir.to_path_buf(),
            AdminArea::new(dir.to_path_buf(), self.store.clone()),
        );

        if recurse {
            let entries = self.store.read_entries(dir)?;
            for entry in entries.values() {
                if entry.is_directory() && !entry.is_this_dir() && !entry.hidden {
                    let child = dir.join(&entry.name);
                    if self.store.is_versioned(&child) {
                        self.open_dir(&child, write_lock, true)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Retrieve the admin area opened for `dir`.
    pub fn retrieve(&self, dir: &Path) -> Result<&AdminArea, WorkingCopyError> {
        if self.closed {
            return Err(WorkingCopyError::Closed);
        }
        self.open
            .get(dir)
            .ok_or_else(|| WorkingCopyError::AdminAreaMissing(dir.to_path_buf()))
    }

    /// Whether `path` is the root of its working copy: a versioned directory
    /// whose parent either is not versioned or does not list it.
    pub fn is_wc_root(&self, path: &Path) -> Result<bool, WorkingCopyError> {
        if !self.store.is_versioned(path) {
            return Err(WorkingCopyError::NotWorkingCopy(path.to_path_buf()));
        }
        let Some(parent) = path.parent() else {
            return Ok(true);
        };
        if !self.store.is_versioned(parent) {
            return Ok(true);
        }
        let Some(name) = path.file_name() else {
            return Ok(true);
        };
        let parent_entries = self.store.read_entries(parent)?;
        Ok(!parent_entries.contains_key(&name.to_string_lossy().to_string()))
    }

    /// Close the scope, releasing every held lock. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        for dir in self.locked.drain(..) {
            self.store.unlock(&dir);
        }
        self.open.clear();
        self.closed = true;
        debug!("closed working copy scope");
    }
}

impl Drop for WcAccess {
    fn drop(&mut self) {
        if !self.closed && !self.locked.is_empty() {
            warn!(
                locks = self.locked.len(),
                "working copy scope dropped without close; releasing locks"
            );
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wc::store::MemoryStore;

    fn fixture() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.add_dir("wc");
        store.add_dir("wc/sub");
        store.add_file("wc", "a.rs");
        store.add_file("wc/sub", "b.rs");
        Arc::new(store)
    }

    #[test]
    fn test_probe_open_file_target_anchors_on_parent() {
        let store = fixture();
        let mut access = WcAccess::new(store);
        let anchor = access
            .probe_open(Path::new("wc/a.rs"), false, Depth::Empty)
            .unwrap();
        assert_eq!(anchor, PathBuf::from("wc"));
        assert!(access.retrieve(Path::new("wc")).is_ok());
    }

    #[test]
    fn test_probe_open_infinity_opens_subtree() {
        let store = fixture();
        let mut access = WcAccess::new(store.clone());
        access
            .probe_open(Path::new("wc"), true, Depth::Infinity)
            .unwrap();
        assert!(access.retrieve(Path::new("wc/sub")).is_ok());
        assert!(store.is_locked("wc"));
        assert!(store.is_locked("wc/sub"));

        access.close();
        assert!(!store.is_locked("wc"));
        assert!(!store.is_locked("wc/sub"));
    }

    #[test]
    fn test_locks_released_on_drop() {
        let store = fixture();
        {
            let mut access = WcAccess::new(store.clone());
            access
                .probe_open(Path::new("wc"), true, Depth::Infinity)
                .unwrap();
            assert!(store.is_locked("wc"));
        }
        assert!(!store.is_locked("wc"));
    }

    #[test]
    fn test_unversioned_path_rejected() {
        let store = fixture();
        let mut access = WcAccess::new(store);
        let err = access
            .probe_open(Path::new("elsewhere/x.rs"), false, Depth::Empty)
            .unwrap_err();
        assert!(matches!(err, WorkingCopyError::NotWorkingCopy(_)));
    }

    #[test]
    fn test_closed_scope_rejects_use() {
        let store = fixture();
        let mut access = WcAccess::new(store);
        access
            .probe_open(Path::new("wc"), false, Depth::Empty)
            .unwrap();
        access.close();
        assert!(matches!(
            access.retrieve(Path::new("wc")),
            Err(WorkingCopyError::Closed)
        ));
    }

    #[test]
    fn test_is_wc_root() {
        let store = fixture();
        let mut access = WcAccess::new(store);
        access
            .probe_open(Path::new("wc"), false, Depth::Infinity)
            .unwrap();
        assert!(access.is_wc_root(Path::new("wc")).unwrap());
        assert!(!access.is_wc_root(Path::new("wc/sub")).unwrap());
    }

    #[test]
    fn test_modify_entry_unknown_name() {
        let store = fixture();
        let mut access = WcAccess::new(store);
        access
            .probe_open(Path::new("wc"), false, Depth::Empty)
            .unwrap();
        let area = access.retrieve(Path::new("wc")).unwrap();
        let err = area
            .modify_entry("ghost.rs", &EntryChanges::set_changelist("x"))
            .unwrap_err();
        assert!(matches!(err, WorkingCopyError::EntryNotFound { .. }));
    }
}
