//! Entry storage backends.
//!
//! [`EntryStore`] is the seam between the working-copy layer and wherever the
//! embedding host keeps its administrative metadata. Two implementations
//! ship: [`MemoryStore`] for in-process use, and [`JsonStore`] which persists
//! one JSON document per working copy for standalone tooling.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::errors::WorkingCopyError;
use crate::wc::entry::{Entry, THIS_DIR};

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Backend storage for administrative entries.
///
/// Directories are keyed by the paths callers pass in; a store does not
/// normalize beyond what the backend needs. Locking is advisory and
/// per-directory: one write scope at a time.
pub trait EntryStore: Send + Sync {
    /// Whether `dir` is a versioned directory in this store.
    fn is_versioned(&self, dir: &Path) -> bool;

    /// Read all entries of a versioned directory, keyed by entry name.
    fn read_entries(&self, dir: &Path) -> Result<BTreeMap<String, Entry>, WorkingCopyError>;

    /// Write one entry back into a versioned directory.
    fn write_entry(&self, dir: &Path, entry: Entry) -> Result<(), WorkingCopyError>;

    /// Take the write lock on a directory.
    fn try_lock(&self, dir: &Path) -> Result<(), WorkingCopyError>;

    /// Release the write lock on a directory. Unlocking a directory that is
    /// not locked is a no-op.
    fn unlock(&self, dir: &Path);
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-process entry store for embedding hosts and tests.
#[derive(Default)]
pub struct MemoryStore {
    dirs: Mutex<HashMap<PathBuf, BTreeMap<String, Entry>>>,
    locks: Mutex<HashSet<PathBuf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a versioned directory. Creates the self-entry and, when the
    /// parent directory is already versioned, a child entry in the parent.
    pub fn add_dir(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref().to_path_buf();
        let mut dirs = self.dirs.lock().expect("store mutex poisoned");

        if let (Some(parent), Some(name)) = (dir.parent(), dir.file_name()) {
            if let Some(parent_entries) = dirs.get_mut(parent) {
                let name = name.to_string_lossy().to_string();
                parent_entries.insert(name.clone(), Entry::dir(name));
            }
        }

        dirs.entry(dir)
            .or_default()
            .insert(THIS_DIR.to_string(), Entry::this_dir());
    }

    /// Register a versioned file inside an already-registered directory.
    pub fn add_file(&self, dir: impl AsRef<Path>, name: &str) {
        let mut dirs = self.dirs.lock().expect("store mutex poisoned");
        dirs.entry(dir.as_ref().to_path_buf())
            .or_default()
            .insert(name.to_string(), Entry::file(name));
    }

    /// Insert or replace an arbitrary entry (fixture setup).
    pub fn add_entry(&self, dir: impl AsRef<Path>, entry: Entry) {
        let mut dirs = self.dirs.lock().expect("store mutex poisoned");
        dirs.entry(dir.as_ref().to_path_buf())
            .or_default()
            .insert(entry.name.clone(), entry);
    }

    /// Whether a directory currently holds its write lock (test helper).
    pub fn is_locked(&self, dir: impl AsRef<Path>) -> bool {
        self.locks
            .lock()
            .expect("store mutex poisoned")
            .contains(dir.as_ref())
    }
}

impl EntryStore for MemoryStore {
    fn is_versioned(&self, dir: &Path) -> bool {
        self.dirs.lock().expect("store mutex poisoned").contains_key(dir)
    }

    fn read_entries(&self, dir: &Path) -> Result<BTreeMap<String, Entry>, WorkingCopyError> {
        self.dirs
            .lock()
            .expect("store mutex poisoned")
            .get(dir)
            .cloned()
            .ok_or_else(|| WorkingCopyError::NotWorkingCopy(dir.to_path_buf()))
    }

    fn write_entry(&self, dir: &Path, entry: Entry) -> Result<(), WorkingCopyError> {
        let mut dirs = self.dirs.lock().expect("store mutex poisoned");
        let entries = dirs
            .get_mut(dir)
            .ok_or_else(|| WorkingCopyError::NotWorkingCopy(dir.to_path_buf()))?;
        debug!(dir = %dir.display(), entry = %entry.name, "writing entry");
        entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    fn try_lock(&self, dir: &Path) -> Result<(), WorkingCopyError> {
        let mut locks = self.locks.lock().expect("store mutex poisoned");
        if !locks.insert(dir.to_path_buf()) {
            return Err(WorkingCopyError::Locked(dir.to_path_buf()));
        }
        debug!(dir = %dir.display(), "write lock acquired");
        Ok(())
    }

    fn unlock(&self, dir: &Path) {
        let mut locks = self.locks.lock().expect("store mutex poisoned");
        if locks.remove(dir) {
            debug!(dir = %dir.display(), "write lock released");
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-file store
// ---------------------------------------------------------------------------

/// Name of the metadata directory a [`JsonStore`] keeps at the working-copy
/// root. This is wckit's own host store, not an `.svn` area.
pub const STORE_DIR: &str = ".wckit";

const ENTRIES_FILE: &str = "entries.json";

/// Entry store persisted as a single JSON document under the working-copy
/// root. Directories are keyed by their path relative to the root; locking
/// is process-local.
pub struct JsonStore {
    root: PathBuf,
    dirs: Mutex<HashMap<PathBuf, BTreeMap<String, Entry>>>,
    locks: Mutex<HashSet<PathBuf>>,
}

impl JsonStore {
    /// Whether `root` carries a wckit store.
    pub fn exists(root: &Path) -> bool {
        root.join(STORE_DIR).join(ENTRIES_FILE).is_file()
    }

    /// Create a fresh store at `root` with the root directory registered.
    pub fn init(root: &Path) -> Result<Self, WorkingCopyError> {
        let store = Self {
            root: root.to_path_buf(),
            dirs: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashSet::new()),
        };
        {
            let mut dirs = store.dirs.lock().expect("store mutex poisoned");
            let mut entries = BTreeMap::new();
            entries.insert(THIS_DIR.to_string(), Entry::this_dir());
            dirs.insert(PathBuf::new(), entries);
        }
        std::fs::create_dir_all(root.join(STORE_DIR))?;
        store.save()?;
        debug!(root = %root.display(), "initialized json entry store");
        Ok(store)
    }

    /// Open an existing store at `root`.
    pub fn open(root: &Path) -> Result<Self, WorkingCopyError> {
        let doc_path = root.join(STORE_DIR).join(ENTRIES_FILE);
        if !doc_path.is_file() {
            return Err(WorkingCopyError::NotWorkingCopy(root.to_path_buf()));
        }
        let raw = std::fs::read_to_string(&doc_path)?;
        let doc: HashMap<String, BTreeMap<String, Entry>> = serde_json::from_str(&raw)
            .map_err(|e| WorkingCopyError::Store(format!("corrupt entries document: {e}")))?;
        let dirs = doc
            .into_iter()
            .map(|(rel, entries)| (PathBuf::from(rel), entries))
            .collect();
        Ok(Self {
            root: root.to_path_buf(),
            dirs: Mutex::new(dirs),
            locks: Mutex::new(HashSet::new()),
        })
    }

    /// The working-copy root this store serves.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register a versioned directory (and its child entry in the parent).
    pub fn add_dir(&self, dir: &Path) -> Result<(), WorkingCopyError> {
        let rel = self.rel(dir)?;
        {
            let mut dirs = self.dirs.lock().expect("store mutex poisoned");
            if let (Some(parent), Some(name)) = (rel.parent(), rel.file_name()) {
                if let Some(parent_entries) = dirs.get_mut(parent) {
                    let name = name.to_string_lossy().to_string();
                    parent_entries.insert(name.clone(), Entry::dir(name));
                }
            }
            dirs.entry(rel)
                .or_default()
                .insert(THIS_DIR.to_string(), Entry::this_dir());
        }
        self.save()
    }

    /// Register a versioned file inside a registered directory.
    pub fn add_file(&self, dir: &Path, name: &str) -> Result<(), WorkingCopyError> {
        let rel = self.rel(dir)?;
        {
            let mut dirs = self.dirs.lock().expect("store mutex poisoned");
            let entries = dirs
                .get_mut(&rel)
                .ok_or_else(|| WorkingCopyError::NotWorkingCopy(dir.to_path_buf()))?;
            entries.insert(name.to_string(), Entry::file(name));
        }
        self.save()
    }

    fn rel(&self, dir: &Path) -> Result<PathBuf, WorkingCopyError> {
        dir.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| WorkingCopyError::NotWorkingCopy(dir.to_path_buf()))
    }

    fn save(&self) -> Result<(), WorkingCopyError> {
        let dirs = self.dirs.lock().expect("store mutex poisoned");
        let doc: BTreeMap<String, &BTreeMap<String, Entry>> = dirs
            .iter()
            .map(|(rel, entries)| (rel.to_string_lossy().to_string(), entries))
            .collect();
        let raw = serde_json::to_string_pretty(&doc)
            .map_err(|e| WorkingCopyError::Store(format!("serializing entries: {e}")))?;
        std::fs::write(self.root.join(STORE_DIR).join(ENTRIES_FILE), raw)?;
        Ok(())
    }
}

impl EntryStore for JsonStore {
    fn is_versioned(&self, dir: &Path) -> bool {
        match self.rel(dir) {
            Ok(rel) => self
                .dirs
                .lock()
                .expect("store mutex poisoned")
                .contains_key(&rel),
            Err(_) => false,
        }
    }

    fn read_entries(&self, dir: &Path) -> Result<BTreeMap<String, Entry>, WorkingCopyError> {
        let rel = self.rel(dir)?;
        self.dirs
            .lock()
            .expect("store mutex poisoned")
            .get(&rel)
            .cloned()
            .ok_or_else(|| WorkingCopyError::NotWorkingCopy(dir.to_path_buf()))
    }

    fn write_entry(&self, dir: &Path, entry: Entry) -> Result<(), WorkingCopyError> {
        let rel = self.rel(dir)?;
        {
            let mut dirs = self.dirs.lock().expect("store mutex poisoned");
            let entries = dirs
                .get_mut(&rel)
                .ok_or_else(|| WorkingCopyError::NotWorkingCopy(dir.to_path_buf()))?;
            debug!(dir = %dir.display(), entry = %entry.name, "writing entry");
            entries.insert(entry.name.clone(), entry);
        }
        self.save()
    }

    fn try_lock(&self, dir: &Path) -> Result<(), WorkingCopyError> {
        let mut locks = self.locks.lock().expect("store mutex poisoned");
        if !locks.insert(dir.to_path_buf()) {
            return Err(WorkingCopyError::Locked(dir.to_path_buf()));
        }
        Ok(())
    }

    fn unlock(&self, dir: &Path) {
        self.locks.lock().expect("store mutex poisoned").remove(dir);
    }
}
