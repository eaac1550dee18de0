//! Qiniu Kodo, the only provider that supports sync.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use nexushub_client::{ApiClient, UploadFile};
use nexushub_common::{Error, FileDescriptor, FileId, ProviderKind, Result};
use nexushub_sync::{SyncEndpoints, SyncEngine, SyncMonitor, SyncOptions, SyncReport};

use super::{FormField, ObjectStore};
use crate::config::ProviderConfig;
use crate::provider::{ListOptions, StorageService, UploadOptions};

const FIELDS: &[FormField] = &[
    FormField::required("access_key", "accessKey"),
    FormField::required("secret_key", "secretKey"),
    FormField::required("bucket", "bucket"),
    FormField::optional("region", "region"),
    FormField::optional("domain", "domain"),
];

/// Qiniu Kodo.
///
/// Uploads like the other object stores and pushes the backend's files to the
/// bucket on [`StorageService::sync`]. The server offers no bucket listing,
/// so every sync uploads every local file.
pub struct QiniuProvider {
    store: ObjectStore,
    monitor: SyncMonitor,
}

impl QiniuProvider {
    pub fn new(config: ProviderConfig, client: Arc<ApiClient>) -> Result<Self> {
        Ok(Self {
            store: ObjectStore::new(ProviderKind::Qiniu, config, client, FIELDS)?,
            monitor: SyncMonitor::new(ProviderKind::Qiniu),
        })
    }
}

#[async_trait]
impl StorageService for QiniuProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Qiniu
    }

    fn config(&self) -> &ProviderConfig {
        self.store.config()
    }

    async fn upload(&self, file: UploadFile, options: &UploadOptions) -> Result<FileDescriptor> {
        self.store.upload(file, options).await
    }

    fn file_url(&self, file_id: &FileId) -> String {
        self.store.file_url(file_id)
    }

    /// Always empty.
    async fn list_files(&self, options: &ListOptions) -> Result<Vec<FileDescriptor>> {
        debug!(
            "Qiniu listing is not available, reporting no files under {:?}",
            options.path
        );
        Ok(Vec::new())
    }

    async fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let endpoints = QiniuEndpoints { provider: self };
        SyncEngine::new(&endpoints, &self.monitor)
            .run(options)
            .await
            .map_err(|e| {
                error!("{}", describe_sync_failure(&e));
                e
            })
    }

    fn sync_monitor(&self) -> Option<&SyncMonitor> {
        Some(&self.monitor)
    }
}

/// Backend store on one side, the Qiniu bucket on the other.
struct QiniuEndpoints<'a> {
    provider: &'a QiniuProvider,
}

#[async_trait]
impl SyncEndpoints for QiniuEndpoints<'_> {
    async fn list_local(&self, path: &str) -> Result<Vec<FileDescriptor>> {
        self.provider.store.client().list_files(Some(path)).await
    }

    async fn list_remote(&self, path: &str) -> Result<Vec<FileDescriptor>> {
        self.provider
            .list_files(&ListOptions::with_path(path))
            .await
    }

    async fn fetch_local(&self, file: &FileDescriptor) -> Result<Vec<u8>> {
        let data = self.provider.store.client().download_file(&file.id).await?;
        Ok(data.to_vec())
    }

    async fn push_remote(&self, file: &FileDescriptor, data: Vec<u8>, path: &str) -> Result<()> {
        let upload = UploadFile::new(file.file_name.clone(), data);
        self.provider
            .store
            .upload(upload, &UploadOptions::with_path(path))
            .await?;
        Ok(())
    }
}

/// Explain a failed sync for the log.
fn describe_sync_failure(err: &Error) -> String {
    match err.status() {
        Some(404) => {
            "Qiniu sync failed: sync is not implemented by the server, check the backend storage configuration"
                .to_string()
        }
        Some(403) => "Qiniu sync failed: insufficient permission for the storage bucket".to_string(),
        Some(500) => "Qiniu sync failed: the server hit an internal error".to_string(),
        _ => format!("Qiniu sync failed: {}", err),
    }
}
