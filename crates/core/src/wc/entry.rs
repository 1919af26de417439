//! Administrative entry records.
//!
//! An [`Entry`] is the metadata record for one versioned file or directory.
//! Each versioned directory's admin area holds one entry per child plus a
//! self-entry (empty name) describing the directory itself.

use serde::{Deserialize, Serialize};

use crate::types::{NodeKind, Revision, INVALID_REVISION};

/// Entry name reserved for a directory's self-entry.
pub const THIS_DIR: &str = "";

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Scheduled state of an entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Add,
    Delete,
    Replace,
}

/// The administrative metadata record for one versioned node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Entry name within its directory; [`THIS_DIR`] for the self-entry.
    pub name: String,

    /// Node kind.
    pub kind: NodeKind,

    /// Committed revision of this node.
    #[serde(default = "invalid_revision")]
    pub revision: Revision,

    /// Repository URL of this node, if known.
    #[serde(default)]
    pub url: Option<String>,

    /// Changelist membership. Never an empty string; a file belongs to at
    /// most one changelist at a time.
    #[serde(default)]
    pub changelist: Option<String>,

    /// Scheduled add/delete/replace state.
    #[serde(default)]
    pub schedule: Option<Schedule>,

    /// Hidden entries (deleted or absent) are skipped by walks unless the
    /// caller asks for them.
    #[serde(default)]
    pub hidden: bool,
}

fn invalid_revision() -> Revision {
    INVALID_REVISION
}

impl Entry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            revision: INVALID_REVISION,
            url: None,
            changelist: None,
            schedule: None,
            hidden: false,
        }
    }

    /// Create a directory self-entry.
    pub fn this_dir() -> Self {
        Self {
            name: THIS_DIR.to_string(),
            kind: NodeKind::Dir,
            revision: INVALID_REVISION,
            url: None,
            changelist: None,
            schedule: None,
            hidden: false,
        }
    }

    /// Create a directory child entry (the record a parent keeps for a
    /// versioned subdirectory).
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Dir,
            revision: INVALID_REVISION,
            url: None,
            changelist: None,
            schedule: None,
            hidden: false,
        }
    }

    /// Whether this is a directory's self-entry.
    pub fn is_this_dir(&self) -> bool {
        self.name == THIS_DIR
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Dir
    }
}

// ---------------------------------------------------------------------------
// Entry changes
// ---------------------------------------------------------------------------

/// A typed set of modifications for `AdminArea::modify_entry`.
///
/// Fields use a two-level option: the outer level selects whether the
/// attribute changes at all, the inner level is the new value. This keeps
/// "leave unchanged", "clear", and "set" as three distinct states instead of
/// overloading one nullable string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryChanges {
    /// New changelist membership, if it changes.
    pub changelist: Option<Option<String>>,
}

impl EntryChanges {
    /// Change that sets changelist membership to `name`.
    pub fn set_changelist(name: &str) -> Self {
        Self {
            changelist: Some(Some(name.to_string())),
        }
    }

    /// Change that clears changelist membership.
    pub fn clear_changelist() -> Self {
        Self {
            changelist: Some(None),
        }
    }

    /// Whether the change set is empty.
    pub fn is_empty(&self) -> bool {
        self.changelist.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_this_dir_discrimination() {
        assert!(Entry::this_dir().is_this_dir());
        assert!(!Entry::file("a.rs").is_this_dir());
        assert!(!Entry::dir("sub").is_this_dir());
        assert!(Entry::this_dir().is_directory());
    }

    #[test]
    fn test_entry_changes_three_states() {
        let unchanged = EntryChanges::default();
        assert!(unchanged.is_empty());

        let set = EntryChanges::set_changelist("fixes");
        assert_eq!(set.changelist, Some(Some("fixes".to_string())));

        let clear = EntryChanges::clear_changelist();
        assert_eq!(clear.changelist, Some(None));
        assert_ne!(set, clear);
    }

    #[test]
    fn test_entry_serde_defaults() {
        let json = r#"{"name":"a.rs","kind":"file"}"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.revision, INVALID_REVISION);
        assert!(entry.changelist.is_none());
        assert!(!entry.hidden);
    }
}
