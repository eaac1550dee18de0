//! Common utilities and types shared across the NexusHub client crates.
//!
//! This module provides the file and provider identifiers exchanged with the
//! backend, plus the error taxonomy every crate reports through.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{FileDescriptor, FileId, ProviderKind, SecretString};
