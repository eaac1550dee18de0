//! Common types used throughout the NexusHub client.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifier of a file stored by the backend.
///
/// The backend issues numeric ids, but any non-empty string is accepted so
/// that ids can be passed through from the command line unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    /// Create a new FileId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "File id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for FileId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FileId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self::from(n)),
            Raw::Text(s) => Self::new(s).map_err(de::Error::custom),
        }
    }
}

/// A file as listed by the backend.
///
/// Identity is `id`; `file_name` is what listings are diffed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: FileId,
    #[serde(alias = "name")]
    pub file_name: String,
    #[serde(default, alias = "file_path")]
    pub path: String,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "file_size")]
    pub size: u64,
}

impl FileDescriptor {
    /// Name used to match this file against another listing.
    pub fn name(&self) -> &str {
        &self.file_name
    }
}

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// The backend's own disk.
    Local,
    /// Aliyun OSS.
    Oss,
    /// Tencent Cloud COS.
    Cos,
    /// AWS S3.
    S3,
    /// Qiniu Kodo.
    Qiniu,
}

impl ProviderKind {
    /// Every supported kind, in catalog order.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Local,
        ProviderKind::Oss,
        ProviderKind::Cos,
        ProviderKind::S3,
        ProviderKind::Qiniu,
    ];

    /// Wire name, as sent in the `storage_type` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Oss => "oss",
            ProviderKind::Cos => "cos",
            ProviderKind::S3 => "s3",
            ProviderKind::Qiniu => "qiniu",
        }
    }

    /// Human readable vendor name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Local => "Local Storage",
            ProviderKind::Oss => "Aliyun OSS",
            ProviderKind::Cos => "Tencent Cloud COS",
            ProviderKind::S3 => "AWS S3",
            ProviderKind::Qiniu => "Qiniu Kodo",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::UnsupportedProvider(s.to_string()))
    }
}

/// Secret string that zeroizes on drop and never prints its contents.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Access the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED; {} chars])", self.0.len())
    }
}
