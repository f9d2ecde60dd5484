//! Storage factories: one location, many items.

use crate::backend::Backend;
use crate::encrypted::Layer;
use crate::error::StorageResult;
use crate::registry::StorageRegistry;
use crate::storage::{Storage, StorageOptions};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Source {
    Backend(Arc<dyn Backend>),
    Layer {
        base: Box<StorageFactory>,
        layer: Arc<dyn Layer>,
    },
}

/// Builds storages for one location on demand.
///
/// Modules that need several items receive a factory instead of single
/// storages. Synchronizing two factories walks every item registered at
/// the first one (see [`StorageFactory::all_registered`]).
#[derive(Debug, Clone)]
pub struct StorageFactory {
    registry: StorageRegistry,
    source: Source,
    options: StorageOptions,
}

impl StorageFactory {
    pub(crate) fn on_backend(
        registry: StorageRegistry,
        backend: Arc<dyn Backend>,
        options: StorageOptions,
    ) -> Self {
        Self {
            registry,
            source: Source::Backend(backend),
            options,
        }
    }

    pub(crate) fn on_layer(
        registry: StorageRegistry,
        base: StorageFactory,
        layer: Arc<dyn Layer>,
        options: StorageOptions,
    ) -> Self {
        Self {
            registry,
            source: Source::Layer {
                base: Box::new(base),
                layer,
            },
            options,
        }
    }

    /// Registry storages are created in.
    #[must_use]
    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    /// Kind of the storages this factory returns.
    #[must_use]
    pub fn kind(&self) -> &str {
        match &self.source {
            Source::Backend(backend) => backend.kind(),
            Source::Layer { layer, .. } => layer.kind(),
        }
    }

    /// Location of the storages this factory returns.
    #[must_use]
    pub fn location(&self) -> &str {
        match &self.source {
            Source::Backend(backend) => backend.location(),
            Source::Layer { base, .. } => base.location(),
        }
    }

    /// Returns the live storage for `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if creation is locked by the registry context.
    pub fn get(&self, name: &str) -> StorageResult<Arc<Storage>> {
        match &self.source {
            Source::Backend(backend) => {
                self.registry
                    .get(Arc::clone(backend), name, self.options.clone())
            }
            Source::Layer { base, layer } => {
                let base_storage = base.get(name)?;
                self.registry
                    .get_layered(&base_storage, Arc::clone(layer), self.options.clone())
            }
        }
    }

    /// All live storages of this factory's kind at its location.
    ///
    /// Items that exist physically but were never obtained through the
    /// registry are not listed.
    #[must_use]
    pub fn all_registered(&self) -> Vec<Arc<Storage>> {
        match &self.source {
            Source::Backend(backend) => self.registry.registered(backend.kind(), backend.location()),
            Source::Layer { base, layer } => base
                .all_registered()
                .into_iter()
                .filter(|storage| storage.kind() == layer.kind())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypted::{EncryptionKey, EncryptionLayer};
    use crate::memory::InMemoryBackend;
    use appxf_codec::{SerializerKind, Value};

    #[test]
    fn factory_creates_and_reuses() {
        let registry = StorageRegistry::new();
        let factory = registry.factory(
            Arc::new(InMemoryBackend::new("a")),
            StorageOptions::new().with_serializer(SerializerKind::Json),
        );
        assert_eq!(factory.kind(), "RamStorage");
        assert_eq!(factory.location(), "a");

        let foo = factory.get("foo").unwrap();
        assert_eq!(foo.serializer(), SerializerKind::Json);
        assert!(Arc::ptr_eq(&foo, &factory.get("foo").unwrap()));
    }

    #[test]
    fn all_registered_lists_created_items() {
        let registry = StorageRegistry::new();
        let factory = registry.factory(Arc::new(InMemoryBackend::new("a")), StorageOptions::new());
        assert!(factory.all_registered().is_empty());

        factory.get("two").unwrap();
        factory.get("one").unwrap();
        let names: Vec<String> = factory
            .all_registered()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn layered_factory_routes_through_layer() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let base = registry.factory(Arc::new(area.clone()), StorageOptions::new());
        let layer = Arc::new(EncryptionLayer::new(EncryptionKey::generate()));
        let secure = registry
            .layered_factory(&base, layer, StorageOptions::new())
            .unwrap();
        assert_eq!(secure.kind(), "EncryptedStorage");
        assert_eq!(secure.location(), "a");

        let item = secure.get("vault").unwrap();
        item.store(&Value::from("secret")).unwrap();

        // the base factory now hands out the layered storage
        let via_base = base.all_registered();
        assert_eq!(via_base.len(), 1);
        assert!(Arc::ptr_eq(&via_base[0], &item));
        assert_eq!(via_base[0].load().unwrap(), Value::from("secret"));

        let via_layer = secure.all_registered();
        assert_eq!(via_layer.len(), 1);
        assert!(Arc::ptr_eq(&secure.get("vault").unwrap(), &item));
    }
}
