//! Merge outcome and conflict-context model.
//!
//! These types are produced by an external merge driver and consumed by a
//! pluggable conflict-resolution callback; they carry no merge algorithm of
//! their own.

pub mod conflict;
pub mod file_set;
pub mod result;

pub use conflict::{
    ConflictAction, ConflictChoice, ConflictDescription, ConflictHandler, ConflictReason,
    ConflictResult, ConflictVariant, ConflictVersion, Operation,
};
pub use file_set::MergeFileSet;
pub use result::{MergeResult, MergeStatus};
