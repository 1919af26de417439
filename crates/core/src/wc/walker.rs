//! Depth-driven entry traversal.
//!
//! [`walk_entries`] visits the administrative entries under a target path,
//! invoking an [`EntryHandler`] per entry. Traversal is depth-first with the
//! directory self-entry visited before children; entries within a directory
//! are visited in name order. Failures reading a directory are routed
//! through [`EntryHandler::handle_error`], whose default re-raises them.

use std::path::Path;

use tracing::warn;

use crate::errors::WorkingCopyError;
use crate::types::Depth;
use crate::wc::access::WcAccess;
use crate::wc::entry::Entry;

/// Per-entry callback contract for [`walk_entries`].
pub trait EntryHandler {
    /// Visit one entry. `path` is the working-copy path of the node the
    /// entry describes (for a self-entry, the directory itself).
    fn handle_entry(&mut self, path: &Path, entry: &Entry) -> Result<(), WorkingCopyError>;

    /// Invoked when reading an entry or directory fails. The default
    /// re-raises, aborting the walk.
    fn handle_error(&mut self, path: &Path, err: WorkingCopyError) -> Result<(), WorkingCopyError> {
        warn!(path = %path.display(), error = %err, "entry walk failed");
        Err(err)
    }
}

/// Walk the entries under `path` to `depth`.
///
/// A file target visits exactly its own entry (read from the parent's admin
/// area). Cancellation is polled at every entry via the access scope's event
/// handler.
pub fn walk_entries(
    access: &WcAccess,
    path: &Path,
    handler: &mut dyn EntryHandler,
    show_hidden: bool,
    depth: Depth,
) -> Result<(), WorkingCopyError> {
    if access.store().is_versioned(path) {
        return walk_dir(access, path, handler, show_hidden, depth);
    }

    // File target: its record lives in the parent directory's admin area.
    access.check_cancelled()?;
    let parent = path
        .parent()
        .ok_or_else(|| WorkingCopyError::NotWorkingCopy(path.to_path_buf()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| WorkingCopyError::NotWorkingCopy(path.to_path_buf()))?;

    let area = match access.retrieve(parent) {
        Ok(area) => area,
        Err(err) => return handler.handle_error(path, err),
    };
    match area.entry(&name) {
        Ok(Some(entry)) if show_hidden || !entry.hidden => handler.handle_entry(path, &entry),
        Ok(Some(_)) => Ok(()),
        Ok(None) => handler.handle_error(
            path,
            WorkingCopyError::EntryNotFound {
                dir: parent.to_path_buf(),
                name,
            },
        ),
        Err(err) => handler.handle_error(path, err),
    }
}

fn walk_dir(
    access: &WcAccess,
    dir: &Path,
    handler: &mut dyn EntryHandler,
    show_hidden: bool,
    depth: Depth,
) -> Result<(), WorkingCopyError> {
    let area = match access.retrieve(dir) {
        Ok(area) => area,
        Err(err) => return handler.handle_error(dir, err),
    };
    let entries = match area.entries(show_hidden) {
        Ok(entries) => entries,
        Err(err) => return handler.handle_error(dir, err),
    };

    for entry in &entries {
        access.check_cancelled()?;

        if entry.is_this_dir() {
            handler.handle_entry(dir, entry)?;
            continue;
        }

        let child = dir.join(&entry.name);
        if entry.is_file() {
            if depth.includes_files() {
                handler.handle_entry(&child, entry)?;
            }
        } else if entry.is_directory() && depth.includes_dirs() {
            match depth.descend() {
                Some(child_depth) => {
                    if access.store().is_versioned(&child) {
                        walk_dir(access, &child, handler, show_hidden, child_depth)?;
                    } else {
                        handler.handle_error(
                            &child,
                            WorkingCopyError::NotWorkingCopy(child.clone()),
                        )?;
                    }
                }
                // Walks that stop at this level still visit the child's
                // record in the parent.
                None => handler.handle_entry(&child, entry)?,
            }
        }
    }
    Ok(())
}
