//! HTTP transport for the NexusHub REST API.
//!
//! Every call goes through [`ApiClient`], which attaches the bearer token,
//! applies the configured timeout, unwraps the `{code, data, message}`
//! response envelope and maps HTTP failures onto the common error taxonomy.

pub mod client;
pub mod config;
pub mod envelope;
pub mod files;
pub mod theme;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use envelope::unwrap_envelope;
pub use files::{UploadFile, UploadRequest};
pub use theme::ThemeSettings;
