//! Provider configuration: static catalog defaults merged with user overrides.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use nexushub_common::{Error, ProviderKind, Result};

/// One layer of provider configuration, keyed by setting name.
pub type ConfigLayer = Map<String, Value>;

/// Environment variables read into the catalog, per provider and config key.
const ENV_DEFAULTS: &[(ProviderKind, &str, &str)] = &[
    (ProviderKind::Oss, "endpoint", "NEXUSHUB_OSS_ENDPOINT"),
    (ProviderKind::Oss, "accessKeyId", "NEXUSHUB_OSS_ACCESS_KEY_ID"),
    (ProviderKind::Oss, "accessKeySecret", "NEXUSHUB_OSS_ACCESS_KEY_SECRET"),
    (ProviderKind::Oss, "bucket", "NEXUSHUB_OSS_BUCKET"),
    (ProviderKind::Oss, "region", "NEXUSHUB_OSS_REGION"),
    (ProviderKind::Cos, "secretId", "NEXUSHUB_COS_SECRET_ID"),
    (ProviderKind::Cos, "secretKey", "NEXUSHUB_COS_SECRET_KEY"),
    (ProviderKind::Cos, "region", "NEXUSHUB_COS_REGION"),
    (ProviderKind::Cos, "bucket", "NEXUSHUB_COS_BUCKET"),
    (ProviderKind::S3, "endpoint", "NEXUSHUB_S3_ENDPOINT"),
    (ProviderKind::S3, "accessKeyId", "NEXUSHUB_S3_ACCESS_KEY_ID"),
    (ProviderKind::S3, "secretAccessKey", "NEXUSHUB_S3_SECRET_ACCESS_KEY"),
    (ProviderKind::S3, "region", "NEXUSHUB_S3_REGION"),
    (ProviderKind::S3, "bucket", "NEXUSHUB_S3_BUCKET"),
    (ProviderKind::Qiniu, "accessKey", "NEXUSHUB_QINIU_ACCESS_KEY"),
    (ProviderKind::Qiniu, "secretKey", "NEXUSHUB_QINIU_SECRET_KEY"),
    (ProviderKind::Qiniu, "bucket", "NEXUSHUB_QINIU_BUCKET"),
    (ProviderKind::Qiniu, "region", "NEXUSHUB_QINIU_REGION"),
    (ProviderKind::Qiniu, "domain", "NEXUSHUB_QINIU_DOMAIN"),
];

/// Environment variable naming the default provider.
pub const DEFAULT_STORAGE_ENV: &str = "NEXUSHUB_DEFAULT_STORAGE";

/// Merged, immutable configuration of one provider instance.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    kind: ProviderKind,
    values: ConfigLayer,
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Display name, from the `name` setting or the vendor name.
    pub fn name(&self) -> &str {
        self.get_str("name").unwrap_or(self.kind.display_name())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String setting, ignoring empty strings.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }

    /// String setting that must be present.
    ///
    /// # Errors
    /// - `Config` if the key is missing or empty
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key).ok_or_else(|| {
            Error::Config(format!("{} requires '{}' to be configured", self.name(), key))
        })
    }

    pub fn values(&self) -> &ConfigLayer {
        &self.values
    }

    /// Values with credentials masked, for display.
    pub fn redacted(&self) -> ConfigLayer {
        self.values
            .iter()
            .map(|(key, value)| {
                let value = if is_sensitive(key) && value.as_str().is_some_and(|v| !v.is_empty()) {
                    Value::String("***".to_string())
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("values", &self.redacted())
            .finish()
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("secret") || key.contains("key")
}

/// Builds a [`ProviderConfig`] from layers; later layers win per key.
pub struct ProviderConfigBuilder {
    kind: ProviderKind,
    values: ConfigLayer,
}

impl ProviderConfigBuilder {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            values: ConfigLayer::new(),
        }
    }

    /// Merge a layer over everything added so far. Absent layers are skipped.
    pub fn layer(mut self, layer: Option<&ConfigLayer>) -> Self {
        if let Some(layer) = layer {
            for (key, value) in layer {
                self.values.insert(key.clone(), value.clone());
            }
        }
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Finish the configuration. `type` always reflects the provider kind.
    pub fn build(mut self) -> ProviderConfig {
        self.values
            .insert("type".to_string(), Value::String(self.kind.as_str().to_string()));
        ProviderConfig {
            kind: self.kind,
            values: self.values,
        }
    }
}

/// Static description of the supported providers and their defaults.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    default_name: String,
    defaults: BTreeMap<ProviderKind, ConfigLayer>,
}

impl ProviderCatalog {
    /// Catalog with names only and `local` as the default.
    pub fn builtin() -> Self {
        let defaults = ProviderKind::ALL
            .into_iter()
            .map(|kind| {
                let mut layer = ConfigLayer::new();
                layer.insert("name".to_string(), Value::String(kind.display_name().to_string()));
                layer.insert("type".to_string(), Value::String(kind.as_str().to_string()));
                (kind, layer)
            })
            .collect();

        Self {
            default_name: ProviderKind::Local.as_str().to_string(),
            defaults,
        }
    }

    /// Built-in catalog with credentials and the default provider taken from
    /// `NEXUSHUB_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ProviderCatalog::from_env`], with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut catalog = Self::builtin();

        for (kind, key, var) in ENV_DEFAULTS {
            if let Some(value) = lookup(var) {
                catalog = catalog.with_default_value(*kind, *key, value);
            }
        }

        if let Some(name) = lookup(DEFAULT_STORAGE_ENV).filter(|n| !n.is_empty()) {
            catalog.default_name = name;
        }

        catalog
    }

    /// Name of the provider used when none is requested or preferred.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn with_default_value(
        mut self,
        kind: ProviderKind,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.defaults
            .entry(kind)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Default layer for a provider.
    pub fn defaults(&self, kind: ProviderKind) -> Option<&ConfigLayer> {
        self.defaults.get(&kind)
    }

    /// Providers in catalog order.
    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.defaults.keys().copied()
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
