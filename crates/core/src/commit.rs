//! Commit items and packets.
//!
//! A [`CommitItem`] is one scheduled change; a [`CommitPacket`] is the set
//! of items one commit drives, with per-item skip state and the lock tokens
//! the commit needs. The packet owns the working-copy access scope that
//! gathered it and releases it exactly once on disposal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CommitError;
use crate::types::{NodeKind, Revision};
use crate::wc::access::WcAccess;

// ---------------------------------------------------------------------------
// Commit item
// ---------------------------------------------------------------------------

/// One scheduled change heading into a commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitItem {
    /// Working-copy path of the item.
    pub path: PathBuf,
    /// Repository URL of the item.
    pub url: String,
    /// Copy source URL, for copied items.
    #[serde(default)]
    pub copy_from_url: Option<String>,
    /// Copy source revision, for copied items.
    #[serde(default)]
    pub copy_from_revision: Option<Revision>,
    /// Node kind.
    pub kind: NodeKind,
    /// Base revision the change is against.
    pub revision: Revision,

    #[serde(default)]
    pub added: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub contents_modified: bool,
    #[serde(default)]
    pub properties_modified: bool,
    #[serde(default)]
    pub copied: bool,
    #[serde(default)]
    pub locked: bool,

    /// Property changes going out with this item.
    #[serde(default)]
    pub outgoing_properties: Option<HashMap<String, String>>,
}

impl CommitItem {
    /// Create an item with all change flags cleared.
    pub fn new(
        path: impl Into<PathBuf>,
        url: impl Into<String>,
        kind: NodeKind,
        revision: Revision,
    ) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            copy_from_url: None,
            copy_from_revision: None,
            kind,
            revision,
            added: false,
            deleted: false,
            contents_modified: false,
            properties_modified: false,
            copied: false,
            locked: false,
            outgoing_properties: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Commit packet
// ---------------------------------------------------------------------------

struct PacketEntry {
    item: CommitItem,
    skipped: bool,
}

/// The items one commit operation drives.
///
/// Skip state is kept per item, keyed by working-copy path; looking up a
/// path the packet does not contain is an explicit error, never a silent
/// default.
pub struct CommitPacket {
    entries: Vec<PacketEntry>,
    index: HashMap<PathBuf, usize>,
    lock_tokens: Option<HashMap<String, String>>,
    access: Option<WcAccess>,
    disposed: bool,
}

impl CommitPacket {
    /// A packet with no items and no access scope.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A packet over `items` with no access scope attached.
    pub fn new(items: Vec<CommitItem>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.path.clone(), i))
            .collect();
        let entries = items
            .into_iter()
            .map(|item| PacketEntry {
                item,
                skipped: false,
            })
            .collect();
        Self {
            entries,
            index,
            lock_tokens: None,
            access: None,
            disposed: false,
        }
    }

    /// A packet that owns the access scope which gathered it; the scope is
    /// released when the packet is disposed.
    pub fn with_access(items: Vec<CommitItem>, access: WcAccess) -> Self {
        let mut packet = Self::new(items);
        packet.access = Some(access);
        packet
    }

    /// Attach per-URL lock tokens.
    pub fn set_lock_tokens(&mut self, tokens: HashMap<String, String>) {
        self.lock_tokens = Some(tokens);
    }

    pub fn lock_tokens(&self) -> Option<&HashMap<String, String>> {
        self.lock_tokens.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the items in packet order.
    pub fn items(&self) -> impl Iterator<Item = &CommitItem> {
        self.entries.iter().map(|e| &e.item)
    }

    /// Look up an item by working-copy path.
    pub fn item(&self, path: &Path) -> Option<&CommitItem> {
        self.index.get(path).map(|&i| &self.entries[i].item)
    }

    /// Whether the item at `path` is marked skipped.
    pub fn is_skipped(&self, path: &Path) -> Result<bool, CommitError> {
        let &i = self
            .index
            .get(path)
            .ok_or_else(|| CommitError::ItemNotFound(path.to_path_buf()))?;
        Ok(self.entries[i].skipped)
    }

    /// Mark the item at `path` skipped or not.
    pub fn set_skipped(&mut self, path: &Path, skipped: bool) -> Result<(), CommitError> {
        let &i = self
            .index
            .get(path)
            .ok_or_else(|| CommitError::ItemNotFound(path.to_path_buf()))?;
        debug!(path = %path.display(), skipped, "commit item skip state changed");
        self.entries[i].skipped = skipped;
        Ok(())
    }

    /// Iterate the items that are not skipped.
    pub fn unskipped_items(&self) -> impl Iterator<Item = &CommitItem> {
        self.entries
            .iter()
            .filter(|e| !e.skipped)
            .map(|e| &e.item)
    }

    /// Release the owned working-copy scope. The first call closes it;
    /// repeat calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut access) = self.access.take() {
            access.close();
            debug!("commit packet disposed; working copy scope released");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for CommitPacket {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::types::Depth;
    use crate::wc::store::MemoryStore;

    fn items() -> Vec<CommitItem> {
        vec![
            CommitItem::new("wc/a.rs", "https://svn.example.com/repo/a.rs", NodeKind::File, 7),
            CommitItem::new("wc/b.rs", "https://svn.example.com/repo/b.rs", NodeKind::File, 7),
        ]
    }

    #[test]
    fn test_skip_state_by_path() {
        let mut packet = CommitPacket::new(items());
        assert!(!packet.is_skipped(Path::new("wc/a.rs")).unwrap());

        packet.set_skipped(Path::new("wc/a.rs"), true).unwrap();
        assert!(packet.is_skipped(Path::new("wc/a.rs")).unwrap());
        assert!(!packet.is_skipped(Path::new("wc/b.rs")).unwrap());

        let remaining: Vec<_> = packet.unskipped_items().map(|i| i.path.clone()).collect();
        assert_eq!(remaining, vec![PathBuf::from("wc/b.rs")]);
    }

    #[test]
    fn test_unknown_item_is_an_explicit_error() {
        let mut packet = CommitPacket::new(items());
        assert!(matches!(
            packet.is_skipped(Path::new("wc/ghost.rs")),
            Err(CommitError::ItemNotFound(_))
        ));
        assert!(matches!(
            packet.set_skipped(Path::new("wc/ghost.rs"), true),
            Err(CommitError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_dispose_releases_scope_exactly_once() {
        let store = MemoryStore::new();
        store.add_dir("wc");
        let store = Arc::new(store);

        let mut access = WcAccess::new(store.clone());
        access
            .probe_open(Path::new("wc"), true, Depth::Empty)
            .unwrap();
        assert!(store.is_locked("wc"));

        let mut packet = CommitPacket::with_access(items(), access);
        packet.dispose();
        assert!(packet.is_disposed());
        assert!(!store.is_locked("wc"));

        // Second disposal is a no-op.
        packet.dispose();
        assert!(packet.is_disposed());
    }

    #[test]
    fn test_drop_disposes() {
        let store = MemoryStore::new();
        store.add_dir("wc");
        let store = Arc::new(store);

        {
            let mut access = WcAccess::new(store.clone());
            access
                .probe_open(Path::new("wc"), true, Depth::Empty)
                .unwrap();
            let _packet = CommitPacket::with_access(items(), access);
        }
        assert!(!store.is_locked("wc"));
    }

    #[test]
    fn test_empty_packet() {
        let packet = CommitPacket::empty();
        assert!(packet.is_empty());
        assert_eq!(packet.items().count(), 0);
    }
}
