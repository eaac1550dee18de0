//! File endpoints: listing, upload, download, deletion.

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use nexushub_common::{Error, FileDescriptor, FileId, ProviderKind, Result};

use crate::client::ApiClient;

/// Characters left unescaped in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// File content to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
            content_type: None,
        }
    }

    /// Set the MIME type of the file part.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk.
    ///
    /// # Errors
    /// - Path has no file name
    /// - I/O errors
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Path has no file name: {}", path.display()))
            })?
            .to_string();

        let data = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A `POST /files/upload` call.
///
/// The backend performs the vendor interaction; the client only forwards the
/// provider configuration as extra form fields.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: UploadFile,
    pub storage_type: ProviderKind,
    /// Provider specific form fields, in send order.
    pub fields: Vec<(&'static str, String)>,
    /// Target directory on the backend.
    pub path: Option<String>,
    /// Overrides the client's default request timeout.
    pub timeout: Option<Duration>,
}

impl UploadRequest {
    pub fn new(file: UploadFile, storage_type: ProviderKind) -> Self {
        Self {
            file,
            storage_type,
            fields: Vec::new(),
            path: None,
            timeout: None,
        }
    }

    pub fn with_field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path.filter(|p| !p.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_form(self) -> Result<Form> {
        let mut part = Part::bytes(self.file.data).file_name(self.file.file_name);
        if let Some(content_type) = &self.file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| Error::InvalidInput(format!("Invalid content type: {}", e)))?;
        }

        let mut form = Form::new()
            .part("file", part)
            .text("storage_type", self.storage_type.as_str());

        for (name, value) in self.fields {
            form = form.text(name, value);
        }

        if let Some(path) = self.path {
            form = form.text("path", path);
        }

        Ok(form)
    }
}

impl ApiClient {
    /// List files stored by the backend under `path` (empty for all).
    pub async fn list_files(&self, path: Option<&str>) -> Result<Vec<FileDescriptor>> {
        let files: Option<Vec<FileDescriptor>> =
            self.get("/files", &[("path", path.unwrap_or(""))]).await?;
        Ok(files.unwrap_or_default())
    }

    /// Upload a file through the generic upload endpoint.
    pub async fn upload_file(&self, request: UploadRequest) -> Result<FileDescriptor> {
        debug!(
            "Uploading {} ({} bytes) to {}",
            request.file.file_name,
            request.file.len(),
            request.storage_type
        );

        let timeout = request.timeout;
        let form = request.into_form()?;
        self.post_multipart("/files/upload", form, timeout).await
    }

    /// Download a file's bytes.
    pub async fn download_file(&self, file_id: &FileId) -> Result<Bytes> {
        self.get_bytes(&Self::download_path(file_id)).await
    }

    /// Delete a file.
    pub async fn delete_file(&self, file_id: &FileId) -> Result<()> {
        let path = format!("/files/{}", encode_segment(file_id.as_str()));
        let _ack: Value = self.delete(&path).await?;
        Ok(())
    }

    /// Absolute download URL for a file. No request is made.
    pub fn download_url(&self, file_id: &FileId) -> String {
        self.url(&Self::download_path(file_id))
    }

    fn download_path(file_id: &FileId) -> String {
        format!("/files/download/{}", encode_segment(file_id.as_str()))
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
