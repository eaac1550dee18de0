//! The backend's own disk storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::error;

use nexushub_client::{ApiClient, UploadFile, UploadRequest};
use nexushub_common::{Error, FileDescriptor, FileId, ProviderKind, Result};

use crate::config::ProviderConfig;
use crate::provider::{ListOptions, StorageService, UploadOptions};

/// Files stored on the NexusHub server itself.
///
/// The only provider that supports listing, downloading and deleting.
pub struct LocalProvider {
    config: ProviderConfig,
    client: Arc<ApiClient>,
}

impl LocalProvider {
    /// Create a local provider.
    ///
    /// # Errors
    /// - `Config` if the configuration belongs to another provider
    pub fn new(config: ProviderConfig, client: Arc<ApiClient>) -> Result<Self> {
        if config.kind() != ProviderKind::Local {
            return Err(Error::Config(format!(
                "Expected local storage configuration, got {}",
                config.kind()
            )));
        }
        Ok(Self { config, client })
    }
}

#[async_trait]
impl StorageService for LocalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn upload(&self, file: UploadFile, options: &UploadOptions) -> Result<FileDescriptor> {
        let request =
            UploadRequest::new(file, ProviderKind::Local).with_path(options.path.clone());

        self.client.upload_file(request).await.map_err(|e| {
            error!("Local upload failed: {}", e);
            e
        })
    }

    fn file_url(&self, file_id: &FileId) -> String {
        self.client.download_url(file_id)
    }

    async fn list_files(&self, options: &ListOptions) -> Result<Vec<FileDescriptor>> {
        self.client.list_files(options.path.as_deref()).await
    }

    async fn download_file(&self, file_id: &FileId) -> Result<Bytes> {
        self.client.download_file(file_id).await
    }

    async fn delete_file(&self, file_id: &FileId) -> Result<()> {
        self.client.delete_file(file_id).await
    }
}
