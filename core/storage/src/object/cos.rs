//! Tencent Cloud COS.

use async_trait::async_trait;
use std::sync::Arc;

use nexushub_client::{ApiClient, UploadFile};
use nexushub_common::{FileDescriptor, FileId, ProviderKind, Result};

use super::{FormField, ObjectStore};
use crate::config::ProviderConfig;
use crate::provider::{StorageService, UploadOptions};

const FIELDS: &[FormField] = &[
    FormField::required("secret_id", "secretId"),
    FormField::required("secret_key", "secretKey"),
    FormField::required("bucket", "bucket"),
    FormField::optional("region", "region"),
];

/// Tencent Cloud COS, upload only.
pub struct CosProvider {
    store: ObjectStore,
}

impl CosProvider {
    pub fn new(config: ProviderConfig, client: Arc<ApiClient>) -> Result<Self> {
        Ok(Self {
            store: ObjectStore::new(ProviderKind::Cos, config, client, FIELDS)?,
        })
    }
}

#[async_trait]
impl StorageService for CosProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cos
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_support::{client_for, config, stored};
    use nexushub_common::Error;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_with_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .and(body_string_contains("secret_id"))
            .and(body_string_contains("/backups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored(4, "db.sql")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = CosProvider::new(
            config(
                ProviderKind::Cos,
                json!({"secretId": "id", "secretKey": "key", "bucket": "bk-1250000000"}),
            ),
            client_for(&server),
        )
        .unwrap();

        provider
            .upload(
                UploadFile::new("db.sql", b"select 1;".to_vec()),
                &UploadOptions::with_path("/backups"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_download_is_not_supported() {
        let server = MockServer::start().await;
        let provider = CosProvider::new(config(ProviderKind::Cos, json!({})), client_for(&server))
            .unwrap();

        assert!(matches!(
            provider.download_file(&FileId::from(1)).await,
            Err(Error::NotImplemented(_))
        ));
    }
}
