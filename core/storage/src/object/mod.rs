//! Vendor object storage providers.
//!
//! The NexusHub server talks to the vendors. These providers validate their
//! credentials up front and forward them as upload form fields.

mod cos;
mod oss;
mod qiniu;
mod s3;

pub use cos::CosProvider;
pub use oss::OssProvider;
pub use qiniu::QiniuProvider;
pub use s3::S3Provider;

use std::sync::Arc;
use tracing::{debug, error};

use nexushub_client::{ApiClient, UploadFile, UploadRequest};
use nexushub_common::{Error, FileDescriptor, FileId, ProviderKind, Result};

use crate::config::ProviderConfig;
use crate::provider::UploadOptions;

/// A configuration value forwarded as an upload form field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FormField {
    /// Multipart field name.
    pub form: &'static str,
    /// Configuration key holding the value.
    pub key: &'static str,
    pub required: bool,
}

impl FormField {
    pub(crate) const fn required(form: &'static str, key: &'static str) -> Self {
        Self {
            form,
            key,
            required: true,
        }
    }

    pub(crate) const fn optional(form: &'static str, key: &'static str) -> Self {
        Self {
            form,
            key,
            required: false,
        }
    }
}

/// Upload plumbing shared by the object storage providers.
pub(crate) struct ObjectStore {
    config: ProviderConfig,
    client: Arc<ApiClient>,
    fields: &'static [FormField],
}

impl ObjectStore {
    /// # Errors
    /// - `Config` if the configuration belongs to another provider
    pub(crate) fn new(
        kind: ProviderKind,
        config: ProviderConfig,
        client: Arc<ApiClient>,
        fields: &'static [FormField],
    ) -> Result<Self> {
        if config.kind() != kind {
            return Err(Error::Config(format!(
                "Expected {} configuration, got {}",
                kind,
                config.kind()
            )));
        }
        Ok(Self {
            config,
            client,
            fields,
        })
    }

    pub(crate) fn kind(&self) -> ProviderKind {
        self.config.kind()
    }

    pub(crate) fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Resolve the form fields to send.
    ///
    /// # Errors
    /// - `Config` naming every missing required key
    pub(crate) fn form_fields(&self) -> Result<Vec<(&'static str, String)>> {
        let mut values = Vec::with_capacity(self.fields.len());
        let mut missing = Vec::new();

        for field in self.fields {
            match self.config.get_str(field.key) {
                Some(value) => values.push((field.form, value.to_string())),
                None if field.required => missing.push(field.key),
                None => {}
            }
        }

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "{} is missing required settings: {}",
                self.config.name(),
                missing.join(", ")
            )));
        }

        Ok(values)
    }

    /// Upload through the server with this provider's credentials.
    pub(crate) async fn upload(
        &self,
        file: UploadFile,
        options: &UploadOptions,
    ) -> Result<FileDescriptor> {
        let kind = self.kind();
        let fields = self.form_fields()?;

        let mut request = UploadRequest::new(file, kind)
            .with_path(options.path.clone())
            .with_timeout(self.client.config().upload_timeout());
        for (name, value) in fields {
            request = request.with_field(name, value);
        }

        debug!("Uploading {} to {}", request.file.file_name, kind);

        match self.client.upload_file(request).await {
            Ok(file) => Ok(file),
            Err(e) if e.status() == Some(404) => {
                error!("{} upload endpoint not found: {}", kind, e);
                Err(Error::NotImplemented(format!(
                    "{} upload is not implemented by the server, check the backend storage configuration",
                    kind.display_name()
                )))
            }
            Err(e) => {
                error!("{} upload failed: {}", kind, e);
                Err(e)
            }
        }
    }

    pub(crate) fn file_url(&self, file_id: &FileId) -> String {
        self.client.download_url(file_id)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ProviderConfigBuilder;
    use nexushub_client::ClientConfig;
    use serde_json::json;
    use wiremock::MockServer;

    pub(crate) fn client_for(server: &MockServer) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(ClientConfig::new(server.uri())).unwrap())
    }

    pub(crate) fn config(kind: ProviderKind, values: serde_json::Value) -> ProviderConfig {
        let layer = values.as_object().cloned().unwrap_or_default();
        ProviderConfigBuilder::new(kind).layer(Some(&layer)).build()
    }

    pub(crate) fn stored(id: u64, name: &str) -> serde_json::Value {
        json!({"code": 0, "data": {"id": id, "file_name": name}})
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIELDS: &[FormField] = &[
        FormField::optional("endpoint", "endpoint"),
        FormField::required("access_key_id", "accessKeyId"),
        FormField::required("bucket", "bucket"),
    ];

    #[tokio::test]
    async fn test_missing_credentials_send_nothing() {
        let server = MockServer::start().await;
        let store = ObjectStore::new(
            ProviderKind::Oss,
            config(ProviderKind::Oss, json!({"bucket": ""})),
            client_for(&server),
            FIELDS,
        )
        .unwrap();

        let err = store
            .upload(UploadFile::new("a.txt", b"a".to_vec()), &UploadOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("accessKeyId, bucket"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_optional_fields_forwarded_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .and(body_string_contains("oss-cn-hangzhou.example.com"))
            .and(body_string_contains("AKID"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored(3, "a.txt")))
            .expect(1)
            .mount(&server)
            .await;

        let store = ObjectStore::new(
            ProviderKind::Oss,
            config(
                ProviderKind::Oss,
                json!({
                    "endpoint": "oss-cn-hangzhou.example.com",
                    "accessKeyId": "AKID",
                    "bucket": "photos"
                }),
            ),
            client_for(&server),
            FIELDS,
        )
        .unwrap();

        let fields = store.form_fields().unwrap();
        assert_eq!(
            fields,
            vec![
                ("endpoint", "oss-cn-hangzhou.example.com".to_string()),
                ("access_key_id", "AKID".to_string()),
                ("bucket", "photos".to_string()),
            ]
        );

        let file = store
            .upload(UploadFile::new("a.txt", b"a".to_vec()), &UploadOptions::default())
            .await
            .unwrap();
        assert_eq!(file.file_name, "a.txt");
    }

    #[tokio::test]
    async fn test_not_found_means_not_implemented() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = ObjectStore::new(
            ProviderKind::Oss,
            config(ProviderKind::Oss, json!({"accessKeyId": "AKID", "bucket": "b"})),
            client_for(&server),
            FIELDS,
        )
        .unwrap();

        let err = store
            .upload(UploadFile::new("a.txt", b"a".to_vec()), &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
        assert!(err.to_string().contains("Aliyun OSS upload is not implemented"));
    }

    #[tokio::test]
    async fn test_other_statuses_pass_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(413))
            .mount(&server)
            .await;

        let store = ObjectStore::new(
            ProviderKind::Oss,
            config(ProviderKind::Oss, json!({"accessKeyId": "AKID", "bucket": "b"})),
            client_for(&server),
            FIELDS,
        )
        .unwrap();

        let err = store
            .upload(UploadFile::new("a.txt", b"a".to_vec()), &UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(413));
    }

    #[test]
    fn test_rejects_foreign_config() {
        let client = Arc::new(ApiClient::new(nexushub_client::ClientConfig::default()).unwrap());
        let result = ObjectStore::new(
            ProviderKind::Cos,
            config(ProviderKind::S3, json!({})),
            client,
            FIELDS,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
