//! Aliyun OSS.

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
    FormField::required("access_key_secret", "accessKeySecret"),
    FormField::required("bucket", "bucket"),
    FormField::optional("region", "region"),
];

/// Aliyun OSS, upload only.
pub struct OssProvider {
    store: ObjectStore,
}

impl OssProvider {
    pub fn new(config: ProviderConfig, client: Arc<ApiClient>) -> Result<Self> {
        Ok(Self {
            store: ObjectStore::new(ProviderKind::Oss, config, client, FIELDS)?,
        })
    }
}

#[async_trait]
impl StorageService for OssProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Oss
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
    use crate::provider::ListOptions;
    use nexushub_common::Error;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_forwards_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .and(body_string_contains("access_key_secret"))
            .and(body_string_contains("oss-secret"))
            .and(body_string_contains("cn-shanghai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored(9, "report.pdf")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OssProvider::new(
            config(
                ProviderKind::Oss,
                json!({
                    "accessKeyId": "oss-id",
                    "accessKeySecret": "oss-secret",
                    "bucket": "reports",
                    "region": "cn-shanghai"
                }),
            ),
            client_for(&server),
        )
        .unwrap();

        let file = provider
            .upload(
                UploadFile::new("report.pdf", b"%PDF".to_vec()),
                &UploadOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(file.id.as_str(), "9");
    }

    #[tokio::test]
    async fn test_listing_is_not_supported() {
        let server = MockServer::start().await;
        let provider = OssProvider::new(config(ProviderKind::Oss, json!({})), client_for(&server))
            .unwrap();

        let err = provider.list_files(&ListOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
