//! Conflict descriptions and the resolution callback contract.
//!
//! A [`ConflictDescription`] is constructed by the merge driver the moment a
//! conflict is detected and is immutable from then on. A caller-supplied
//! [`ConflictHandler`] consumes it and answers with a [`ConflictResult`].
//!
//! The text/property/tree distinction is a closed sum type
//! ([`ConflictVariant`]); each variant carries exactly the fields that exist
//! for its kind, so inconsistent combinations cannot be represented.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::MergeError;
use crate::merge::file_set::MergeFileSet;
use crate::types::{NodeKind, Revision};

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

/// The incoming change that provoked the conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    Edit,
    Add,
    Delete,
}

impl std::fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit => write!(f, "edit"),
            Self::Add => write!(f, "add"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// The local state that made the incoming change conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Local edits overlap the incoming change.
    Edited,
    /// An unversioned item is in the way.
    Obstructed,
    /// The local item was deleted.
    Deleted,
    /// The local item is missing.
    Missing,
    /// The local item is unversioned.
    Unversioned,
    /// A local add collides with an incoming add.
    Added,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edited => write!(f, "edited"),
            Self::Obstructed => write!(f, "obstructed"),
            Self::Deleted => write!(f, "deleted"),
            Self::Missing => write!(f, "missing"),
            Self::Unversioned => write!(f, "unversioned"),
            Self::Added => write!(f, "added"),
        }
    }
}

/// The operation that was running when a tree conflict arose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Update,
    Switch,
    Merge,
    None,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Switch => write!(f, "switch"),
            Self::Merge => write!(f, "merge"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A repository-side snapshot of the node bracketing a tree conflict: the
/// merge-left ("before") or merge-right ("incoming after") version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictVersion {
    /// Repository root URL.
    pub repos_url: Option<String>,
    /// Peg revision of the snapshot.
    pub peg_revision: Revision,
    /// Node path relative to the repository root.
    pub path_in_repos: Option<String>,
    /// Node kind at that revision.
    pub node_kind: NodeKind,
}

impl ConflictVersion {
    pub fn new(
        repos_url: Option<String>,
        peg_revision: Revision,
        path_in_repos: Option<String>,
        node_kind: NodeKind,
    ) -> Self {
        Self {
            repos_url,
            peg_revision,
            path_in_repos,
            node_kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// Which kind of conflict this is, with the kind-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConflictVariant {
    /// Overlapping content changes in a file's text.
    Text,
    /// Conflicting changes to one versioned property.
    Property { property_name: String },
    /// Structural conflict: add/delete/move against an incoming change.
    Tree {
        operation: Operation,
        left_version: ConflictVersion,
        right_version: ConflictVersion,
    },
}

/// Full context for one detected conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictDescription {
    /// The merge files bracketing the conflict.
    pub files: MergeFileSet,
    /// Kind of the conflicted node.
    pub node_kind: NodeKind,
    /// The incoming change.
    pub action: ConflictAction,
    /// The local state it collided with.
    pub reason: ConflictReason,
    /// Text/property/tree specifics.
    pub variant: ConflictVariant,
}

impl ConflictDescription {
    /// A text conflict on a file's content.
    pub fn text(
        files: MergeFileSet,
        node_kind: NodeKind,
        action: ConflictAction,
        reason: ConflictReason,
    ) -> Self {
        Self {
            files,
            node_kind,
            action,
            reason,
            variant: ConflictVariant::Text,
        }
    }

    /// A conflict on the named property.
    pub fn property(
        files: MergeFileSet,
        node_kind: NodeKind,
        action: ConflictAction,
        reason: ConflictReason,
        property_name: impl Into<String>,
    ) -> Self {
        Self {
            files,
            node_kind,
            action,
            reason,
            variant: ConflictVariant::Property {
                property_name: property_name.into(),
            },
        }
    }

    /// A tree conflict, with the left/right version snapshots.
    pub fn tree(
        files: MergeFileSet,
        node_kind: NodeKind,
        action: ConflictAction,
        reason: ConflictReason,
        operation: Operation,
        left_version: ConflictVersion,
        right_version: ConflictVersion,
    ) -> Self {
        Self {
            files,
            node_kind,
            action,
            reason,
            variant: ConflictVariant::Tree {
                operation,
                left_version,
                right_version,
            },
        }
    }

    /// The conflicted working-copy path.
    pub fn path(&self) -> &Path {
        &self.files.wc_path
    }

    /// The conflicted property's name, for property conflicts.
    pub fn property_name(&self) -> Option<&str> {
        match &self.variant {
            ConflictVariant::Property { property_name } => Some(property_name),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// How a conflict handler resolves a conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    /// Leave the conflict for later.
    Postpone,
    /// Take the common-ancestor version.
    Base,
    /// Take the incoming version wholesale.
    TheirsFull,
    /// Keep the local version wholesale.
    MineFull,
    /// Take the incoming side of each conflicting hunk.
    TheirsConflict,
    /// Keep the local side of each conflicting hunk.
    MineConflict,
    /// Use the handler-supplied merged file.
    Merged,
}

impl std::fmt::Display for ConflictChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postpone => write!(f, "postpone"),
            Self::Base => write!(f, "base"),
            Self::TheirsFull => write!(f, "theirs_full"),
            Self::MineFull => write!(f, "mine_full"),
            Self::TheirsConflict => write!(f, "theirs_conflict"),
            Self::MineConflict => write!(f, "mine_conflict"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

impl ConflictChoice {
    /// Whether this choice can resolve `description`. The per-hunk choices
    /// only make sense for text conflicts on non-binary files; merge drivers
    /// reject them elsewhere.
    pub fn is_valid_for(self, description: &ConflictDescription) -> bool {
        match self {
            Self::TheirsConflict | Self::MineConflict => {
                matches!(description.variant, ConflictVariant::Text)
                    && !description.files.is_binary()
            }
            _ => true,
        }
    }

    /// Validate this choice against `description`, producing the error a
    /// merge driver propagates on misuse.
    pub fn validate_for(self, description: &ConflictDescription) -> Result<(), MergeError> {
        if self.is_valid_for(description) {
            return Ok(());
        }
        Err(MergeError::InvalidChoice {
            choice: self.to_string(),
            detail: format!(
                "per-hunk resolution requires a text conflict on a non-binary file ('{}')",
                description.path().display()
            ),
        })
    }
}

/// A conflict handler's answer: the choice, plus the merged file when the
/// choice is [`ConflictChoice::Merged`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictResult {
    pub choice: ConflictChoice,
    pub merged_file: Option<PathBuf>,
}

impl ConflictResult {
    pub fn new(choice: ConflictChoice, merged_file: Option<PathBuf>) -> Self {
        Self {
            choice,
            merged_file,
        }
    }

    /// The default answer: leave the conflict in place.
    pub fn postpone() -> Self {
        Self::new(ConflictChoice::Postpone, None)
    }
}

/// Caller-supplied conflict-resolution callback.
///
/// Returning an error aborts the enclosing merge or update operation; the
/// error is propagated verbatim.
pub trait ConflictHandler {
    fn handle_conflict(
        &self,
        description: &ConflictDescription,
    ) -> Result<ConflictResult, MergeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_conflict(mime: Option<&str>) -> ConflictDescription {
        let mut files = MergeFileSet::new("src/lib.rs");
        files.mime_type = mime.map(str::to_string);
        ConflictDescription::text(
            files,
            NodeKind::File,
            ConflictAction::Edit,
            ConflictReason::Edited,
        )
    }

    #[test]
    fn test_variant_discrimination() {
        let text = text_conflict(None);
        assert!(matches!(text.variant, ConflictVariant::Text));
        assert_eq!(text.property_name(), None);

        let prop = ConflictDescription::property(
            MergeFileSet::new("src/lib.rs"),
            NodeKind::File,
            ConflictAction::Edit,
            ConflictReason::Edited,
            "svn:eol-style",
        );
        assert_eq!(prop.property_name(), Some("svn:eol-style"));

        let tree = ConflictDescription::tree(
            MergeFileSet::new("src"),
            NodeKind::Dir,
            ConflictAction::Delete,
            ConflictReason::Edited,
            Operation::Update,
            ConflictVersion::new(None, 10, Some("trunk/src".into()), NodeKind::Dir),
            ConflictVersion::new(None, 11, None, NodeKind::Unknown),
        );
        match &tree.variant {
            ConflictVariant::Tree {
                operation,
                left_version,
                right_version,
            } => {
                assert_eq!(*operation, Operation::Update);
                assert_eq!(left_version.peg_revision, 10);
                assert_eq!(right_version.peg_revision, 11);
            }
            other => panic!("expected tree variant, got {other:?}"),
        }
    }

    #[test]
    fn test_per_hunk_choices_limited_to_text_conflicts() {
        let text = text_conflict(None);
        assert!(ConflictChoice::TheirsConflict.is_valid_for(&text));
        assert!(ConflictChoice::MineConflict.is_valid_for(&text));

        let binary = text_conflict(Some("application/octet-stream"));
        assert!(!ConflictChoice::TheirsConflict.is_valid_for(&binary));
        assert!(ConflictChoice::TheirsFull.is_valid_for(&binary));

        let prop = ConflictDescription::property(
            MergeFileSet::new("src/lib.rs"),
            NodeKind::File,
            ConflictAction::Edit,
            ConflictReason::Edited,
            "svn:mime-type",
        );
        assert!(!ConflictChoice::MineConflict.is_valid_for(&prop));
        let err = ConflictChoice::MineConflict.validate_for(&prop).unwrap_err();
        assert!(matches!(err, MergeError::InvalidChoice { .. }));
    }

    #[test]
    fn test_postpone_result() {
        let result = ConflictResult::postpone();
        assert_eq!(result.choice, ConflictChoice::Postpone);
        assert!(result.merged_file.is_none());
    }
}
