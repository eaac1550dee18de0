//! Provider registry and the storage service factory.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use nexushub_client::ApiClient;
use nexushub_common::{Error, ProviderKind, Result};

use crate::config::{ProviderCatalog, ProviderConfig, ProviderConfigBuilder};
use crate::provider::StorageService;
use crate::settings::StorageSettings;

/// Factory function type for creating providers.
pub type ProviderFactory =
    Box<dyn Fn(ProviderConfig, Arc<ApiClient>) -> Result<Arc<dyn StorageService>> + Send + Sync>;

/// Registry for storage provider factories, keyed by provider kind.
pub struct ProviderRegistry {
    factories: HashMap<ProviderKind, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Errors
    /// - `Config` if the kind is already registered
    pub fn register(&mut self, kind: ProviderKind, factory: ProviderFactory) -> Result<()> {
        if self.factories.contains_key(&kind) {
            return Err(Error::Config(format!(
                "Provider '{}' is already registered",
                kind
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Construct a provider.
    ///
    /// # Errors
    /// - `UnsupportedProvider` if the kind is not registered
    /// - Whatever the provider's constructor rejects
    pub fn resolve(
        &self,
        kind: ProviderKind,
        config: ProviderConfig,
        client: Arc<ApiClient>,
    ) -> Result<Arc<dyn StorageService>> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| Error::UnsupportedProvider(kind.to_string()))?;
        factory(config, client)
    }

    /// Registered kinds, in catalog order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.factories.contains_key(&kind)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with every built-in provider.
pub fn create_default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    registry.factories.insert(
        ProviderKind::Local,
        Box::new(|config, client| Ok(Arc::new(crate::local::LocalProvider::new(config, client)?))),
    );
    registry.factories.insert(
        ProviderKind::Oss,
        Box::new(|config, client| Ok(Arc::new(crate::object::OssProvider::new(config, client)?))),
    );
    registry.factories.insert(
        ProviderKind::Cos,
        Box::new(|config, client| Ok(Arc::new(crate::object::CosProvider::new(config, client)?))),
    );
    registry.factories.insert(
        ProviderKind::S3,
        Box::new(|config, client| Ok(Arc::new(crate::object::S3Provider::new(config, client)?))),
    );
    registry.factories.insert(
        ProviderKind::Qiniu,
        Box::new(|config, client| {
            Ok(Arc::new(crate::object::QiniuProvider::new(config, client)?))
        }),
    );

    registry
}

/// Resolves provider names to configured [`StorageService`] instances.
///
/// Each call constructs a new instance; configuration is merged from the
/// catalog defaults and the user's overrides at that moment.
pub struct StorageServiceFactory {
    registry: ProviderRegistry,
    catalog: ProviderCatalog,
    settings: Option<StorageSettings>,
    client: Arc<ApiClient>,
}

impl StorageServiceFactory {
    pub fn new(
        client: Arc<ApiClient>,
        catalog: ProviderCatalog,
        settings: Option<StorageSettings>,
    ) -> Self {
        Self {
            registry: create_default_registry(),
            catalog,
            settings,
            client,
        }
    }

    /// Replace the built-in providers.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Provider name used for a request: the requested one, else the user's
    /// preference, else the catalog default.
    pub fn resolve_name(&self, requested: Option<&str>) -> String {
        requested
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.settings
                    .as_ref()
                    .and_then(|s| s.default_storage.clone())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| self.catalog.default_name().to_string())
    }

    /// Catalog defaults overlaid with the user's overrides.
    pub fn provider_config(&self, kind: ProviderKind) -> ProviderConfig {
        ProviderConfigBuilder::new(kind)
            .layer(self.catalog.defaults(kind))
            .layer(self.settings.as_ref().and_then(|s| s.overrides(kind)))
            .build()
    }

    /// Construct the provider for a name, or the default provider.
    ///
    /// # Errors
    /// - `UnsupportedProvider` for unknown or unregistered names; nothing is
    ///   constructed
    pub fn get_storage_service(&self, requested: Option<&str>) -> Result<Arc<dyn StorageService>> {
        let name = self.resolve_name(requested);
        let kind: ProviderKind = name.parse()?;
        if !self.registry.has_provider(kind) {
            return Err(Error::UnsupportedProvider(name));
        }

        debug!("Creating {} storage service", kind);
        self.registry
            .resolve(kind, self.provider_config(kind), Arc::clone(&self.client))
    }
}
