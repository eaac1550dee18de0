//! Storage provider abstraction for NexusHub.
//!
//! This module provides a trait-based interface over the storage backends the
//! NexusHub server can write to (its own disk, Aliyun OSS, Tencent COS, AWS S3
//! and Qiniu Kodo) and a factory that resolves providers by name.
//!
//! # Design Principles
//! - The server performs every vendor interaction; providers only forward
//!   their configuration as upload form fields
//! - Provider configuration is merged once, at construction, and never changes
//! - Capabilities a provider lacks fail with `NotImplemented`

pub mod config;
pub mod local;
pub mod object;
pub mod provider;
pub mod registry;
pub mod settings;

pub use config::{ConfigLayer, ProviderCatalog, ProviderConfig, ProviderConfigBuilder};
pub use local::LocalProvider;
pub use object::{CosProvider, OssProvider, QiniuProvider, S3Provider};
pub use provider::{ListOptions, StorageService, UploadOptions};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry, StorageServiceFactory};
pub use settings::{SettingsStore, StorageSettings};
