//! Lifecycle events emitted by working-copy operations.
//!
//! Operations report progress by dispatching [`WcEvent`] values to an
//! [`EventHandler`]. The handler doubles as the cooperative cancellation
//! point: long-running walks poll [`EventHandler::check_cancelled`] before
//! each path and at every entry.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Cancelled;
use crate::types::NodeKind;

// ---------------------------------------------------------------------------
// Event actions
// ---------------------------------------------------------------------------

/// What a [`WcEvent`] reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// An entry was added to a changelist.
    ChangelistSet,
    /// An entry's changelist membership was cleared.
    ChangelistClear,
    /// An entry is leaving one changelist for another.
    ChangelistMoved,
    /// The item was not processed; `expected_action` says what was asked.
    Skip,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChangelistSet => write!(f, "changelist_set"),
            Self::ChangelistClear => write!(f, "changelist_clear"),
            Self::ChangelistMoved => write!(f, "changelist_moved"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A structured lifecycle event for one working-copy item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WcEvent {
    /// The working-copy path the event concerns.
    pub path: PathBuf,
    /// What happened.
    pub action: EventAction,
    /// For [`EventAction::Skip`], the action that was requested.
    pub expected_action: Option<EventAction>,
    /// Node kind of the item.
    pub node_kind: NodeKind,
    /// The changelist name attached to the event, if any. For a set this is
    /// the new membership; for a move it is the changelist being left.
    pub changelist: Option<String>,
    /// Optional human-readable message (warning text for moves).
    pub message: Option<String>,
}

impl WcEvent {
    /// An entry joined `changelist`.
    pub fn changelist_set(path: &Path, node_kind: NodeKind, changelist: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            action: EventAction::ChangelistSet,
            expected_action: None,
            node_kind,
            changelist: Some(changelist.to_string()),
            message: None,
        }
    }

    /// An entry's changelist membership was cleared.
    pub fn changelist_clear(path: &Path, node_kind: NodeKind) -> Self {
        Self {
            path: path.to_path_buf(),
            action: EventAction::ChangelistClear,
            expected_action: None,
            node_kind,
            changelist: None,
            message: None,
        }
    }

    /// An entry is leaving `old_changelist`; emitted before the membership
    /// change is applied.
    pub fn changelist_moved(path: &Path, node_kind: NodeKind, old_changelist: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            action: EventAction::ChangelistMoved,
            expected_action: None,
            node_kind,
            changelist: Some(old_changelist.to_string()),
            message: Some(format!(
                "Removing '{}' from changelist '{}'",
                path.display(),
                old_changelist
            )),
        }
    }

    /// The item was skipped; `expected` is what the operation would have
    /// done to an eligible item.
    pub fn skipped(path: &Path, node_kind: NodeKind, expected: EventAction) -> Self {
        Self {
            path: path.to_path_buf(),
            action: EventAction::Skip,
            expected_action: Some(expected),
            node_kind,
            changelist: None,
            message: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Receiver for lifecycle events, and the cooperative cancellation poll.
///
/// Dispatch is fire-and-forget: handlers cannot fail an operation through
/// `handle_event`. Cancellation is poll-based; returning `Err(Cancelled)`
/// from `check_cancelled` aborts the walk at the next poll point.
pub trait EventHandler: Send + Sync {
    /// Receive one event.
    fn handle_event(&self, event: &WcEvent);

    /// Poll for cancellation. The default never cancels.
    fn check_cancelled(&self) -> Result<(), Cancelled> {
        Ok(())
    }
}

/// An event handler that discards everything and never cancels.
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {
    fn handle_event(&self, _event: &WcEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moved_event_message() {
        let event = WcEvent::changelist_moved(Path::new("src/lib.rs"), NodeKind::File, "fixes");
        assert_eq!(event.action, EventAction::ChangelistMoved);
        assert_eq!(event.changelist.as_deref(), Some("fixes"));
        assert_eq!(
            event.message.as_deref(),
            Some("Removing 'src/lib.rs' from changelist 'fixes'")
        );
    }

    #[test]
    fn test_skip_event_carries_expected_action() {
        let event = WcEvent::skipped(Path::new("dir"), NodeKind::Dir, EventAction::ChangelistSet);
        assert_eq!(event.action, EventAction::Skip);
        assert_eq!(event.expected_action, Some(EventAction::ChangelistSet));
        assert!(event.changelist.is_none());
    }

    #[test]
    fn test_null_handler_never_cancels() {
        let handler = NullEventHandler;
        assert!(handler.check_cancelled().is_ok());
    }
}
