//! AWS S3 and S3-compatible services.

use async_trait::async_trait;
use std::sync::Arc;

use nexushub_client::{ApiClient, UploadFile};
use nexushub_common::{FileDescriptor, FileId, ProviderKind, Result};

use super::{FormField, ObjectStore};
use crate::config::ProviderConfig;
use crate::provider::{StorageService, UploadOptions};

const FIELDS: &[FormField] = &[
    FormField::optional("endpoint", "endpoint"),
    FormField::required("access_key_id", "accessKeyId"),
    FormField::required("secret_access_key", "secretAccessKey"),
    FormField::required("bucket", "bucket"),
    FormField::optional("region", "region"),
];

/// AWS S3, upload only. `endpoint` selects an S3-compatible service.
pub struct S3Provider {
    store: ObjectStore,
}

impl S3Provider {
    pub fn new(config: ProviderConfig, client: Arc<ApiClient>) -> Result<Self> {
        Ok(Self {
            store: ObjectStore::new(ProviderKind::S3, config, client, FIELDS)?,
        })
    }
}

#[async_trait]
impl StorageService for S3Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::S3
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
}
