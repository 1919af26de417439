//! End-to-end tests for changelist assignment and query walks.
//!
//! These tests exercise the real `ChangelistClient` against:
//! - In-memory entry stores with multi-directory trees
//! - A JSON-file-backed store on a real temp directory
//! - A collecting event handler observing the full event stream
//!
//! No network I/O and no external binaries.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use wckit_core::changelist::ChangelistClient;
use wckit_core::errors::{Cancelled, ChangelistError};
use wckit_core::events::{EventAction, EventHandler, WcEvent};
use wckit_core::types::Depth;
use wckit_core::wc::{EntryStore, JsonStore, MemoryStore};

// ===========================================================================
// Helpers
// ===========================================================================

/// Event handler that records every dispatched event.
struct Collector {
    events: Mutex<Vec<WcEvent>>,
}

impl Collector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn take(&self) -> Vec<WcEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }
}

impl EventHandler for Collector {
    fn handle_event(&self, event: &WcEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Event handler that cancels after a fixed number of polls.
struct CancelAfter {
    remaining: AtomicUsize,
}

impl CancelAfter {
    fn new(polls: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(polls),
        })
    }
}

impl EventHandler for CancelAfter {
    fn handle_event(&self, _event: &WcEvent) {}

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 0 {
            return Err(Cancelled);
        }
        Ok(())
    }
}

/// A working copy with a root dir, two files, and a subdirectory with one
/// file.
fn fixture_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_dir("wc");
    store.add_file("wc", "a.rs");
    store.add_file("wc", "b.rs");
    store.add_dir("wc/sub");
    store.add_file("wc/sub", "c.rs");
    Arc::new(store)
}

fn membership(store: &dyn EntryStore, dir: &str, name: &str) -> Option<String> {
    store.read_entries(Path::new(dir)).unwrap()[name]
        .changelist
        .clone()
}

fn query_hits(
    client: &ChangelistClient,
    names: &[String],
    targets: &[PathBuf],
) -> Vec<(PathBuf, String)> {
    let mut hits = Vec::new();
    client
        .query(Some(names), targets, Depth::Infinity, &mut |path, name| {
            hits.push((path.to_path_buf(), name.to_string()));
        })
        .unwrap();
    hits
}

fn set_of(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ===========================================================================
// Assignment observability and idempotence
// ===========================================================================

#[test]
fn assign_is_observable_and_idempotent() {
    let store = fixture_store();
    let events = Collector::new();
    let client = ChangelistClient::with_event_handler(store.clone(), events.clone());
    let target = vec![PathBuf::from("wc/a.rs")];

    client
        .assign(&target, Some("fixes"), None, Depth::Empty)
        .unwrap();
    let hits = query_hits(&client, &["fixes".to_string()], &target);
    assert_eq!(hits, vec![(PathBuf::from("wc/a.rs"), "fixes".to_string())]);

    let first = events.take();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].action, EventAction::ChangelistSet);
    assert_eq!(first[0].changelist.as_deref(), Some("fixes"));

    // Repeating the same assignment produces no event and no error.
    client
        .assign(&target, Some("fixes"), None, Depth::Empty)
        .unwrap();
    assert!(events.take().is_empty());
    let hits = query_hits(&client, &["fixes".to_string()], &target);
    assert_eq!(hits.len(), 1);
}

#[test]
fn empty_changelist_name_always_rejected_without_mutation() {
    let store = fixture_store();
    let client = ChangelistClient::new(store.clone());
    let target = vec![PathBuf::from("wc")];
    let filter = set_of(&["fixes"]);

    for depth in [Depth::Empty, Depth::Files, Depth::Immediates, Depth::Infinity] {
        for names in [None, Some(&filter)] {
            let err = client
                .assign(&target, Some(""), names, depth)
                .unwrap_err();
            assert!(matches!(err, ChangelistError::EmptyChangelistName));
        }
    }

    assert_eq!(membership(store.as_ref(), "wc", "a.rs"), None);
    assert_eq!(membership(store.as_ref(), "wc", "b.rs"), None);
    assert_eq!(membership(store.as_ref(), "wc/sub", "c.rs"), None);
}

// ===========================================================================
// Moves
// ===========================================================================

#[test]
fn move_emits_warning_then_set_and_updates_queries() {
    let store = fixture_store();
    let events = Collector::new();
    let client = ChangelistClient::with_event_handler(store.clone(), events.clone());
    let target = vec![PathBuf::from("wc/a.rs")];

    client.assign(&target, Some("A"), None, Depth::Empty).unwrap();
    events.take();

    client.assign(&target, Some("B"), None, Depth::Empty).unwrap();
    let stream = events.take();
    assert_eq!(stream.len(), 2);

    assert_eq!(stream[0].action, EventAction::ChangelistMoved);
    assert_eq!(stream[0].changelist.as_deref(), Some("A"));
    assert_eq!(
        stream[0].message.as_deref(),
        Some("Removing 'wc/a.rs' from changelist 'A'")
    );
    assert_eq!(stream[1].action, EventAction::ChangelistSet);
    assert_eq!(stream[1].changelist.as_deref(), Some("B"));

    assert!(query_hits(&client, &["A".to_string()], &target).is_empty());
    assert_eq!(query_hits(&client, &["B".to_string()], &target).len(), 1);
}

// ===========================================================================
// No-op and filter laws
// ===========================================================================

#[test]
fn clearing_an_unassigned_entry_emits_nothing() {
    let store = fixture_store();
    let events = Collector::new();
    let client = ChangelistClient::with_event_handler(store, events.clone());

    for depth in [Depth::Empty, Depth::Files, Depth::Immediates, Depth::Infinity] {
        client
            .assign(&[PathBuf::from("wc/a.rs")], None, None, depth)
            .unwrap();
        assert!(events.take().is_empty());
    }
}

#[test]
fn filter_restricts_assignment_to_named_changelists() {
    let store = fixture_store();
    let client = ChangelistClient::new(store.clone());

    // a.rs in "A", b.rs in "B", c.rs in none.
    client
        .assign(&[PathBuf::from("wc/a.rs")], Some("A"), None, Depth::Empty)
        .unwrap();
    client
        .assign(&[PathBuf::from("wc/b.rs")], Some("B"), None, Depth::Empty)
        .unwrap();

    let events = Collector::new();
    let client = ChangelistClient::with_event_handler(store.clone(), events.clone());
    let filter = set_of(&["A"]);
    client
        .assign(&[PathBuf::from("wc")], Some("C"), Some(&filter), Depth::Infinity)
        .unwrap();

    assert_eq!(membership(store.as_ref(), "wc", "a.rs").as_deref(), Some("C"));
    assert_eq!(membership(store.as_ref(), "wc", "b.rs").as_deref(), Some("B"));
    assert_eq!(membership(store.as_ref(), "wc/sub", "c.rs"), None);

    // Only a.rs produced events: one move, one set. The filtered-out
    // directory self-entries stay silent too.
    let stream = events.take();
    assert_eq!(stream.len(), 2);
    assert!(stream.iter().all(|e| e.path == PathBuf::from("wc/a.rs")));
}

// ===========================================================================
// Directories
// ===========================================================================

#[test]
fn directory_self_entries_only_ever_skip() {
    let store = fixture_store();
    let events = Collector::new();
    let client = ChangelistClient::with_event_handler(store.clone(), events.clone());

    client
        .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
        .unwrap();

    let stream = events.take();
    let dir_events: Vec<_> = stream
        .iter()
        .filter(|e| e.path == Path::new("wc") || e.path == Path::new("wc/sub"))
        .collect();
    assert_eq!(dir_events.len(), 2);
    for event in dir_events {
        assert_eq!(event.action, EventAction::Skip);
        assert_eq!(event.expected_action, Some(EventAction::ChangelistSet));
    }

    // Directory entries never acquire membership and never match queries.
    let hits = query_hits(&client, &["fixes".to_string()], &[PathBuf::from("wc")]);
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|(p, _)| {
        p == Path::new("wc/a.rs") || p == Path::new("wc/b.rs") || p == Path::new("wc/sub/c.rs")
    }));

    // Clearing reports the clear-flavored skip.
    client
        .assign(&[PathBuf::from("wc")], None, None, Depth::Infinity)
        .unwrap();
    let stream = events.take();
    let root_skip = stream
        .iter()
        .find(|e| e.path == Path::new("wc") && e.action == EventAction::Skip)
        .expect("skip event for root dir");
    assert_eq!(root_skip.expected_action, Some(EventAction::ChangelistClear));
}

// ===========================================================================
// Cancellation and failure isolation
// ===========================================================================

#[test]
fn cancellation_aborts_walk_and_releases_locks() {
    let store = fixture_store();
    let handler = CancelAfter::new(3);
    let client = ChangelistClient::with_event_handler(store.clone(), handler);

    let err = client
        .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
        .unwrap_err();
    assert!(matches!(err, ChangelistError::Cancelled(_)));

    // The exclusive scope was released despite the abort.
    assert!(!store.is_locked("wc"));
    assert!(!store.is_locked("wc/sub"));

    // Partial work stands: a new client can keep operating immediately.
    let client = ChangelistClient::new(store);
    client
        .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
        .unwrap();
}

#[test]
fn first_failing_path_aborts_remaining_paths() {
    let store = fixture_store();
    let client = ChangelistClient::new(store.clone());

    let paths = vec![
        PathBuf::from("wc/a.rs"),
        PathBuf::from("nowhere/x.rs"),
        PathBuf::from("wc/b.rs"),
    ];
    let err = client
        .assign(&paths, Some("fixes"), None, Depth::Empty)
        .unwrap_err();
    assert!(matches!(err, ChangelistError::WorkingCopy(_)));

    // Path 1 was processed before the failure; path 3 was never reached.
    assert_eq!(membership(store.as_ref(), "wc", "a.rs").as_deref(), Some("fixes"));
    assert_eq!(membership(store.as_ref(), "wc", "b.rs"), None);
    assert!(!store.is_locked("wc"));
}

#[test]
fn locked_working_copy_is_reported() {
    let store = fixture_store();
    store.try_lock(Path::new("wc")).unwrap();

    let client = ChangelistClient::new(store.clone());
    let err = client
        .assign(&[PathBuf::from("wc")], Some("fixes"), None, Depth::Infinity)
        .unwrap_err();
    assert!(matches!(err, ChangelistError::WorkingCopy(_)));
    assert_eq!(membership(store.as_ref(), "wc", "a.rs"), None);
}

// ===========================================================================
// JSON store end-to-end
// ===========================================================================

#[test]
fn json_store_persists_membership_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("wc");
    std::fs::create_dir(&root).unwrap();

    {
        let store = JsonStore::init(&root).unwrap();
        store.add_dir(&root.join("src")).unwrap();
        store.add_file(&root.join("src"), "lib.rs").unwrap();
        store.add_file(&root, "README.md").unwrap();

        let client = ChangelistClient::new(Arc::new(store));
        client
            .assign(&[root.clone()], Some("docs"), None, Depth::Files)
            .unwrap();
    }

    let store = Arc::new(JsonStore::open(&root).unwrap());
    let client = ChangelistClient::new(store.clone());

    let hits = query_hits(&client, &["docs".to_string()], &[root.clone()]);
    assert_eq!(hits, vec![(root.join("README.md"), "docs".to_string())]);

    // Depth was Files: the file in src/ stayed untouched.
    assert_eq!(
        membership(store.as_ref(), root.join("src").to_str().unwrap(), "lib.rs"),
        None
    );
}
