//! Storage provider trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use nexushub_client::UploadFile;
use nexushub_common::{Error, FileDescriptor, FileId, ProviderKind, Result};
use nexushub_sync::{compare_files, FileDiff, SyncMonitor, SyncOptions, SyncReport};

use crate::config::ProviderConfig;

/// Options for an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Target directory on the backend.
    pub path: Option<String>,
}

impl UploadOptions {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

/// Options for a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Directory to list; absent lists everything.
    pub path: Option<String>,
}

impl ListOptions {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

fn not_implemented(kind: ProviderKind, operation: &str) -> Error {
    Error::NotImplemented(format!(
        "{} does not support {}",
        kind.display_name(),
        operation
    ))
}

/// Storage provider trait for the NexusHub backends.
///
/// Every provider talks to the NexusHub server; the server performs the
/// vendor interaction. Operations a provider does not support fail with
/// [`Error::NotImplemented`] through the provided defaults.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Provider kind.
    fn kind(&self) -> ProviderKind;

    /// Configuration fixed at construction.
    fn config(&self) -> &ProviderConfig;

    /// Display name of this instance.
    fn name(&self) -> &str {
        self.config().name()
    }

    /// Upload a file.
    ///
    /// # Postconditions
    /// - Returns the descriptor the server stored
    ///
    /// # Errors
    /// - `Config` when required credentials are missing (nothing is sent)
    /// - `NotImplemented` when the server has no handler for this provider
    async fn upload(&self, file: UploadFile, options: &UploadOptions) -> Result<FileDescriptor> {
        let _ = (file, options);
        Err(not_implemented(self.kind(), "uploads"))
    }

    /// Download URL for a file. Pure; performs no request.
    fn file_url(&self, file_id: &FileId) -> String;

    /// List files.
    async fn list_files(&self, options: &ListOptions) -> Result<Vec<FileDescriptor>> {
        let _ = options;
        Err(not_implemented(self.kind(), "listing files"))
    }

    /// Download a file's content.
    async fn download_file(&self, file_id: &FileId) -> Result<Bytes> {
        let _ = file_id;
        Err(not_implemented(self.kind(), "downloads"))
    }

    /// Delete a file.
    async fn delete_file(&self, file_id: &FileId) -> Result<()> {
        let _ = file_id;
        Err(not_implemented(self.kind(), "deleting files"))
    }

    /// Push the backend's files to this provider.
    async fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let _ = options;
        Err(not_implemented(self.kind(), "sync"))
    }

    /// Compare a local listing against a remote one by file name.
    fn compare_files(&self, local: &[FileDescriptor], remote: &[FileDescriptor]) -> FileDiff {
        compare_files(local, remote)
    }

    /// Sync status, for providers that support sync.
    fn sync_monitor(&self) -> Option<&SyncMonitor> {
        None
    }
}
