//! Working-copy location helpers.

use std::path::{Path, PathBuf};

use crate::errors::WorkingCopyError;
use crate::wc::store::EntryStore;

/// Whether `dir` is versioned in `store`.
pub fn is_versioned_directory(store: &dyn EntryStore, dir: &Path) -> bool {
    store.is_versioned(dir)
}

/// Whether `path` is the root of its working copy: versioned, and either
/// parentless, under an unversioned parent, or not listed by its parent.
pub fn is_working_copy_root(
    store: &dyn EntryStore,
    path: &Path,
) -> Result<bool, WorkingCopyError> {
    if !store.is_versioned(path) {
        return Err(WorkingCopyError::NotWorkingCopy(path.to_path_buf()));
    }
    let Some(parent) = path.parent() else {
        return Ok(true);
    };
    if !store.is_versioned(parent) {
        return Ok(true);
    }
    let Some(name) = path.file_name() else {
        return Ok(true);
    };
    let entries = store.read_entries(parent)?;
    Ok(!entries.contains_key(&name.to_string_lossy().to_string()))
}

/// Walk upward from `start` to the root of the working copy containing it.
///
/// Returns `None` when `start` is not inside a working copy at all.
pub fn find_wc_root(store: &dyn EntryStore, start: &Path) -> Option<PathBuf> {
    let mut dir = if store.is_versioned(start) {
        start.to_path_buf()
    } else {
        let parent = start.parent()?;
        if !store.is_versioned(parent) {
            return None;
        }
        parent.to_path_buf()
    };

    loop {
        match is_working_copy_root(store, &dir) {
            Ok(true) => return Some(dir),
            Ok(false) => {
                dir = dir.parent()?.to_path_buf();
            }
            Err(_) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wc::store::MemoryStore;

    fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_dir("wc");
        store.add_dir("wc/sub");
        store.add_dir("wc/sub/deep");
        store.add_file("wc/sub/deep", "x.rs");
        store
    }

    #[test]
    fn test_root_detection() {
        let store = fixture();
        assert!(is_working_copy_root(&store, Path::new("wc")).unwrap());
        assert!(!is_working_copy_root(&store, Path::new("wc/sub")).unwrap());
        assert!(!is_working_copy_root(&store, Path::new("wc/sub/deep")).unwrap());
    }

    #[test]
    fn test_find_root_walks_up() {
        let store = fixture();
        assert_eq!(
            find_wc_root(&store, Path::new("wc/sub/deep")),
            Some(PathBuf::from("wc"))
        );
        assert_eq!(
            find_wc_root(&store, Path::new("wc/sub/deep/x.rs")),
            Some(PathBuf::from("wc"))
        );
        assert_eq!(find_wc_root(&store, Path::new("elsewhere/y.rs")), None);
    }
}
