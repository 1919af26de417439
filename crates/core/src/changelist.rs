//! Changelist membership management.
//!
//! A changelist is a client-side-only named grouping of working-copy files;
//! it never leaves the local administrative metadata. [`ChangelistClient`]
//! walks a working-copy tree and enforces the single-membership invariant:
//! each file belongs to at most one changelist, directories to none.
//!
//! `assign` mutates membership and emits lifecycle events; `query` is a
//! read-only walk reporting current membership to a callback.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{Cancelled, ChangelistError, WorkingCopyError};
use crate::events::{EventAction, EventHandler, WcEvent};
use crate::types::Depth;
use crate::wc::access::WcAccess;
use crate::wc::entry::{Entry, EntryChanges};
use crate::wc::store::EntryStore;
use crate::wc::walker::{walk_entries, EntryHandler};

// ---------------------------------------------------------------------------
// Filter matching
// ---------------------------------------------------------------------------

/// Whether `entry` passes a changelist filter. An absent or empty filter
/// matches everything; otherwise the entry must currently belong to one of
/// the named changelists.
pub fn matches_changelist(filter: Option<&HashSet<String>>, entry: &Entry) -> bool {
    match filter {
        None => true,
        Some(names) if names.is_empty() => true,
        Some(names) => entry
            .changelist
            .as_ref()
            .map(|cl| names.contains(cl))
            .unwrap_or(false),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Walks working-copy trees to assign, move, clear, and report changelist
/// membership.
pub struct ChangelistClient {
    store: Arc<dyn EntryStore>,
    handler: Option<Arc<dyn EventHandler>>,
}

impl ChangelistClient {
    /// Create a client over `store` with no event handler.
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            handler: None,
        }
    }

    /// Create a client that dispatches lifecycle events to `handler` and
    /// polls it for cancellation.
    pub fn with_event_handler(store: Arc<dyn EntryStore>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            store,
            handler: Some(handler),
        }
    }

    /// Replace the event handler.
    pub fn set_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handler = Some(handler);
    }

    // -----------------------------------------------------------------------
    // assign
    // -----------------------------------------------------------------------

    /// Set, move, or clear changelist membership under each of `paths` to
    /// `depth`.
    ///
    /// `changelist` of `Some(name)` assigns matching files to `name`;
    /// `None` clears their membership. An empty name is rejected with
    /// [`ChangelistError::EmptyChangelistName`] before any path is touched.
    /// A non-empty `filter` restricts the walk to files currently in one of
    /// the named changelists.
    ///
    /// Paths are processed sequentially, each under its own exclusive
    /// working-copy scope; the scope is released on success, error, and
    /// cancellation alike. The first failing path aborts the remainder, and
    /// mutations already applied stand.
    pub fn assign(
        &self,
        paths: &[PathBuf],
        changelist: Option<&str>,
        filter: Option<&HashSet<String>>,
        depth: Depth,
    ) -> Result<(), ChangelistError> {
        if changelist == Some("") {
            return Err(ChangelistError::EmptyChangelistName);
        }

        info!(
            paths = paths.len(),
            changelist = changelist.unwrap_or("<clear>"),
            %depth,
            "updating changelist membership"
        );

        for path in paths {
            self.check_cancelled()?;
            self.assign_one(path, changelist, filter, depth)?;
        }
        Ok(())
    }

    fn assign_one(
        &self,
        path: &Path,
        target: Option<&str>,
        filter: Option<&HashSet<String>>,
        depth: Depth,
    ) -> Result<(), ChangelistError> {
        let mut access = self.open_access();
        let result = match access.probe_open(path, true, depth) {
            Ok(_) => {
                let mut handler = AssignHandler {
                    access: &access,
                    target,
                    filter,
                };
                walk_entries(&access, path, &mut handler, false, depth)
            }
            Err(err) => Err(err),
        };
        // Release the exclusive scope on every exit path.
        access.close();
        result.map_err(ChangelistError::from)
    }

    // -----------------------------------------------------------------------
    // query
    // -----------------------------------------------------------------------

    /// Report current changelist membership under each of `targets` to
    /// `depth`, invoking `handler(path, changelist)` for every file entry
    /// (or directory self-entry) belonging to one of `changelists`.
    ///
    /// An absent or empty `changelists` set makes this a no-op: with no
    /// names to match, there is nothing to report.
    pub fn query(
        &self,
        changelists: Option<&[String]>,
        targets: &[PathBuf],
        depth: Depth,
        handler: &mut dyn FnMut(&Path, &str),
    ) -> Result<(), ChangelistError> {
        let names: HashSet<&str> = match changelists {
            None => {
                debug!("no changelist names given; nothing to query");
                return Ok(());
            }
            Some(names) if names.is_empty() => {
                debug!("empty changelist name set; nothing to query");
                return Ok(());
            }
            Some(names) => names.iter().map(String::as_str).collect(),
        };

        for target in targets {
            self.check_cancelled()?;
            let mut access = self.open_access();
            let result = match access.probe_open(target, false, depth) {
                Ok(_) => {
                    let mut query = QueryHandler {
                        names: &names,
                        sink: &mut *handler,
                    };
                    walk_entries(&access, target, &mut query, false, depth)
                }
                Err(err) => Err(err),
            };
            access.close();
            result.map_err(ChangelistError::from)?;
        }
        Ok(())
    }

    fn open_access(&self) -> WcAccess {
        match &self.handler {
            Some(handler) => WcAccess::with_event_handler(self.store.clone(), handler.clone()),
            None => WcAccess::new(self.store.clone()),
        }
    }

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        match &self.handler {
            Some(handler) => handler.check_cancelled(),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Walk handlers
// ---------------------------------------------------------------------------

struct AssignHandler<'a> {
    access: &'a WcAccess,
    target: Option<&'a str>,
    filter: Option<&'a HashSet<String>>,
}

impl EntryHandler for AssignHandler<'_> {
    fn handle_entry(&mut self, path: &Path, entry: &Entry) -> Result<(), WorkingCopyError> {
        if !matches_changelist(self.filter, entry) {
            return Ok(());
        }

        if entry.is_directory() {
            // Changelists apply to files only. The self-entry gets an
            // informational skip; other directory entries pass silently.
            if entry.is_this_dir() {
                let expected = if self.target.is_some() {
                    EventAction::ChangelistSet
                } else {
                    EventAction::ChangelistClear
                };
                self.access
                    .dispatch_event(&WcEvent::skipped(path, entry.kind, expected));
            }
            return Ok(());
        }

        let current = entry.changelist.as_deref();
        match (current, self.target) {
            // Already in the requested state.
            (None, None) => return Ok(()),
            (Some(current), Some(target)) if current == target => return Ok(()),
            // Leaving one changelist for another: warn before mutating.
            (Some(current), Some(_)) => {
                self.access
                    .dispatch_event(&WcEvent::changelist_moved(path, entry.kind, current));
            }
            _ => {}
        }

        let parent = path
            .parent()
            .ok_or_else(|| WorkingCopyError::NotWorkingCopy(path.to_path_buf()))?;
        let area = self.access.retrieve(parent)?;
        let changes = match self.target {
            Some(name) => EntryChanges::set_changelist(name),
            None => EntryChanges::clear_changelist(),
        };
        area.modify_entry(&entry.name, &changes)?;

        let event = match self.target {
            Some(name) => WcEvent::changelist_set(path, entry.kind, name),
            None => WcEvent::changelist_clear(path, entry.kind),
        };
        self.access.dispatch_event(&event);
        debug!(
            path = %path.display(),
            changelist = self.target.unwrap_or("<none>"),
            "changelist membership updated"
        );
        Ok(())
    }
}

struct QueryHandler<'a> {
    names: &'a HashSet<&'a str>,
    sink: &'a mut dyn FnMut(&Path, &str),
}

impl EntryHandler for QueryHandler<'_> {
    fn handle_entry(&mut self, path: &Path, entry: &Entry) -> Result<(), WorkingCopyError> {
        if !entry.is_file() && !entry.is_this_dir() {
            return Ok(());
        }
        if let Some(changelist) = entry.changelist.as_deref() {
            if self.names.contains(changelist) {
                (self.sink)(path, changelist);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wc::store::MemoryStore;

    fn fixture() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.add_dir("wc");
        store.add_file("wc", "a.rs");
        store.add_file("wc", "b.rs");
        Arc::new(store)
    }

    fn membership(store: &MemoryStore, name: &str) -> Option<String> {
        store.read_entries(Path::new("wc")).unwrap()[name]
            .changelist
            .clone()
    }

    #[test]
    fn test_empty_changelist_name_rejected_before_mutation() {
        let store = fixture();
        let client = ChangelistClient::new(store.clone());
        for depth in [Depth::Empty, Depth::Files, Depth::Immediates, Depth::Infinity] {
            let err = client
                .assign(&[PathBuf::from("wc")], Some(""), None, depth)
                .unwrap_err();
            assert!(matches!(err, ChangelistError::EmptyChangelistName));
        }
        assert_eq!(membership(&store, "a.rs"), None);
        assert_eq!(membership(&store, "b.rs"), None);
    }

    #[test]
    fn test_assign_and_clear() {
        let store = fixture();
        let client = ChangelistClient::new(store.clone());

        client
            .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
            .unwrap();
        assert_eq!(membership(&store, "a.rs").as_deref(), Some("fixes"));
        assert_eq!(membership(&store, "b.rs").as_deref(), Some("fixes"));

        client
            .assign(&[PathBuf::from("wc/a.rs")], None, None, Depth::Empty)
            .unwrap();
        assert_eq!(membership(&store, "a.rs"), None);
        assert_eq!(membership(&store, "b.rs").as_deref(), Some("fixes"));
    }

    #[test]
    fn test_directory_self_entry_never_assigned() {
        let store = fixture();
        let client = ChangelistClient::new(store.clone());
        client
            .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
            .unwrap();
        let entries = store.read_entries(Path::new("wc")).unwrap();
        assert_eq!(entries[crate::wc::THIS_DIR].changelist, None);
    }

    #[test]
    fn test_query_without_names_is_noop() {
        let store = fixture();
        let client = ChangelistClient::new(store.clone());
        client
            .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
            .unwrap();

        let mut hits = Vec::new();
        client
            .query(None, &[PathBuf::from("wc")], Depth::Infinity, &mut |p, c| {
                hits.push((p.to_path_buf(), c.to_string()));
            })
            .unwrap();
        client
            .query(Some(&[]), &[PathBuf::from("wc")], Depth::Infinity, &mut |p, c| {
                hits.push((p.to_path_buf(), c.to_string()));
            })
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_matches_changelist() {
        let mut entry = Entry::file("a.rs");
        assert!(matches_changelist(None, &entry));
        assert!(matches_changelist(Some(&HashSet::new()), &entry));

        let filter: HashSet<String> = ["fixes".to_string()].into();
        assert!(!matches_changelist(Some(&filter), &entry));

        entry.changelist = Some("fixes".to_string());
        assert!(matches_changelist(Some(&filter), &entry));

        entry.changelist = Some("other".to_string());
        assert!(!matches_changelist(Some(&filter), &entry));
    }
}
