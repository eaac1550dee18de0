//! File listing comparison.

use serde::Serialize;
use std::collections::HashMap;

use nexushub_common::FileDescriptor;

/// Difference between a local and a remote listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileDiff {
    /// Remote files with no local file of the same name.
    pub added: Vec<FileDescriptor>,
    /// Local files with no remote file of the same name.
    pub removed: Vec<FileDescriptor>,
    /// Local files whose same-name remote file was updated later.
    pub modified: Vec<FileDescriptor>,
}

impl FileDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Index a listing by file name, keeping the first file for each name.
pub(crate) fn index_by_name(files: &[FileDescriptor]) -> HashMap<&str, &FileDescriptor> {
    let mut index = HashMap::with_capacity(files.len());
    for file in files {
        index.entry(file.name()).or_insert(file);
    }
    index
}

/// Compare two listings by name.
///
/// Ids are ignored: differently identified files with the same name are
/// treated as the same file. A file is modified only when both sides carry
/// an update time and the remote one is later.
pub fn compare_files(local: &[FileDescriptor], remote: &[FileDescriptor]) -> FileDiff {
    let local_index = index_by_name(local);
    let remote_index = index_by_name(remote);

    let added = remote
        .iter()
        .filter(|r| !local_index.contains_key(r.name()))
        .cloned()
        .collect();

    let removed = local
        .iter()
        .filter(|l| !remote_index.contains_key(l.name()))
        .cloned()
        .collect();

    let modified = local
        .iter()
        .filter(|l| {
            remote_index.get(l.name()).is_some_and(|r| {
                matches!((r.updated_at, l.updated_at), (Some(remote), Some(local)) if remote > local)
            })
        })
        .cloned()
        .collect();

    FileDiff {
        added,
        removed,
        modified,
    }
}
