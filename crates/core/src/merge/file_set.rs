//! File references bracketing one merge step.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The set of files a merge driver works with for one target: the base
/// ("older") version, the local working version ("mine"), the incoming
/// repository version ("theirs"), and where the merged result goes.
///
/// All side files are optional; which ones exist depends on the kind of
/// merge step. Labels feed conflict-marker generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeFileSet {
    /// The target file inside the working copy.
    pub wc_path: PathBuf,

    /// Common-ancestor version.
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    /// Local working version.
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Incoming repository version.
    #[serde(default)]
    pub repository_path: Option<PathBuf>,

    /// Where the merged result is written.
    #[serde(default)]
    pub result_path: Option<PathBuf>,

    /// Conflict-marker label for the base version.
    #[serde(default)]
    pub base_label: Option<String>,

    /// Conflict-marker label for the local version.
    #[serde(default)]
    pub local_label: Option<String>,

    /// Conflict-marker label for the incoming version.
    #[serde(default)]
    pub repository_label: Option<String>,

    /// MIME type of the target, when known.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl MergeFileSet {
    /// A file set for `wc_path` with no side files yet.
    pub fn new(wc_path: impl Into<PathBuf>) -> Self {
        Self {
            wc_path: wc_path.into(),
            ..Self::default()
        }
    }

    /// Whether the target is binary: any MIME type outside `text/` routes
    /// the merge to binary handling.
    pub fn is_binary(&self) -> bool {
        match &self.mime_type {
            Some(mime) => !mime.starts_with("text/"),
            None => false,
        }
    }
}
