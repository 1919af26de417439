//! Merge step outcomes.

use serde::{Deserialize, Serialize};

use crate::merge::conflict::ConflictReason;

/// Outcome category of one merge step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    /// The incoming change applied cleanly over an unmodified target.
    Normal,
    /// Local and incoming changes were combined without conflict.
    Merged,
    /// The changes collided; the target is left in conflict.
    Conflicted,
    /// The incoming change was already present.
    Unchanged,
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Merged => write!(f, "merged"),
            Self::Conflicted => write!(f, "conflicted"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// The outcome of one merge step.
///
/// Fields are private: [`MergeResult::new`] is the only constructor and it
/// normalizes the pair, so downstream consumers can rely on
/// "reason present ⇒ status is Conflicted".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MergeResult {
    status: MergeStatus,
    conflict_reason: Option<ConflictReason>,
}

impl MergeResult {
    /// Build a result for `status`.
    ///
    /// A non-conflicted status drops any supplied reason; a conflicted
    /// status with no reason defaults to [`ConflictReason::Edited`].
    pub fn new(status: MergeStatus, reason: Option<ConflictReason>) -> Self {
        let conflict_reason = match status {
            MergeStatus::Conflicted => Some(reason.unwrap_or(ConflictReason::Edited)),
            _ => None,
        };
        Self {
            status,
            conflict_reason,
        }
    }

    pub fn status(&self) -> MergeStatus {
        self.status
    }

    /// The conflict reason; present exactly when the status is Conflicted.
    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        self.conflict_reason
    }

    pub fn is_conflicted(&self) -> bool {
        self.status == MergeStatus::Conflicted
    }
}
