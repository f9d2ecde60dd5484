//! Registry of live storages, with context switching.

use crate::backend::Backend;
use crate::encrypted::Layer;
use crate::error::{StorageError, StorageResult};
use crate::factory::StorageFactory;
use crate::storage::{MetaSerializers, Storage, StorageOptions, META_TAG, SYNC_TAG};
use appxf_codec::SerializerKind;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::Arc;
use tracing::debug;

/// kind -> location -> name -> storage
type Entries = BTreeMap<String, BTreeMap<String, BTreeMap<String, Arc<Storage>>>>;

#[derive(Debug, Default)]
struct RegistryState {
    context: String,
    locked: bool,
    entries: Entries,
    backups: HashMap<String, Entries>,
}

impl RegistryState {
    fn check_unlocked(&self) -> StorageResult<()> {
        if self.locked {
            return Err(StorageError::ContextLocked);
        }
        Ok(())
    }

    fn lookup(&self, kind: &str, location: &str, name: &str) -> Option<&Arc<Storage>> {
        self.entries.get(kind)?.get(location)?.get(name)
    }

    fn insert(&mut self, kind: &str, storage: Arc<Storage>) {
        self.entries
            .entry(kind.to_string())
            .or_default()
            .entry(storage.location().to_string())
            .or_default()
            .insert(storage.name().to_string(), storage);
    }

    fn remove(&mut self, kind: &str, location: &str, name: &str) {
        let Some(locations) = self.entries.get_mut(kind) else {
            return;
        };
        if let Some(names) = locations.get_mut(location) {
            names.remove(name);
            if names.is_empty() {
                locations.remove(location);
            }
        }
        if locations.is_empty() {
            self.entries.remove(kind);
        }
    }

    fn unregister(&mut self, storage: &Storage) {
        self.remove(storage.kind(), storage.location(), storage.name());
        if let Some(base) = storage.base() {
            self.unregister(base);
        }
    }
}

/// Bookkeeping of live storages.
///
/// At most one storage exists per (kind, location, name). Creating a
/// second one is an error before any I/O happens, which turns two handles
/// silently fighting over one file into an immediate failure.
///
/// The registry is a cheap handle: clones share state. Tests get isolation
/// by constructing a fresh registry. To simulate several application
/// instances against one shared location inside one registry, use
/// [`StorageRegistry::switch_context`].
///
/// # Example
///
/// ```rust
/// use appxf_storage::{InMemoryBackend, StorageOptions, StorageRegistry};
/// use std::sync::Arc;
///
/// let registry = StorageRegistry::new();
/// let area = Arc::new(InMemoryBackend::new("ram"));
/// let foo = registry.create(area.clone(), "foo", StorageOptions::new()).unwrap();
/// assert!(registry.create(area.clone(), "foo", StorageOptions::new()).is_err());
/// let same = registry.get(area, "foo", StorageOptions::new()).unwrap();
/// assert!(Arc::ptr_eq(&foo, &same));
/// ```
#[derive(Debug, Clone)]
pub struct StorageRegistry {
    state: Arc<Mutex<RegistryState>>,
    meta_serializers: MetaSerializers,
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageRegistry {
    /// Creates an empty registry. `meta` and `sync` siblings use JSON.
    #[must_use]
    pub fn new() -> Self {
        let mut meta_serializers = BTreeMap::new();
        meta_serializers.insert(META_TAG.to_string(), SerializerKind::Json);
        meta_serializers.insert(SYNC_TAG.to_string(), SerializerKind::Json);
        Self {
            state: Arc::default(),
            meta_serializers: Arc::new(RwLock::new(meta_serializers)),
        }
    }

    /// Creates and registers a storage for `name` on `backend`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::AlreadyRegistered`] if the item is live
    /// - [`StorageError::ContextLocked`] if creation is locked
    pub fn create(
        &self,
        backend: Arc<dyn Backend>,
        name: &str,
        options: StorageOptions,
    ) -> StorageResult<Arc<Storage>> {
        let mut state = self.state.lock();
        state.check_unlocked()?;
        if let Some(existing) = state.lookup(backend.kind(), backend.location(), name) {
            return Err(StorageError::AlreadyRegistered { id: existing.id() });
        }
        Ok(self.create_locked(&mut state, backend, name, options))
    }

    /// Returns the live storage for `name` on `backend`, creating it if
    /// needed. `options` only apply to a newly created storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ContextLocked`] if creation is locked.
    pub fn get(
        &self,
        backend: Arc<dyn Backend>,
        name: &str,
        options: StorageOptions,
    ) -> StorageResult<Arc<Storage>> {
        let mut state = self.state.lock();
        state.check_unlocked()?;
        if let Some(existing) = state.lookup(backend.kind(), backend.location(), name) {
            return Ok(Arc::clone(existing));
        }
        Ok(self.create_locked(&mut state, backend, name, options))
    }

    fn create_locked(
        &self,
        state: &mut RegistryState,
        backend: Arc<dyn Backend>,
        name: &str,
        options: StorageOptions,
    ) -> Arc<Storage> {
        let storage = Arc::new(Storage::on_backend(
            backend,
            name,
            options,
            state.context.clone(),
            Arc::clone(&self.meta_serializers),
        ));
        state.insert(storage.kind(), Arc::clone(&storage));
        debug!(storage = %storage.id(), "registered");
        storage
    }

    /// Layers `layer` on top of `base`.
    ///
    /// The layered storage registers under the layer kind and also takes
    /// over the slot of `base`, so enumerating the base location yields
    /// the layered handle.
    ///
    /// # Errors
    ///
    /// - [`StorageError::AlreadyRegistered`] if the layered item is live
    /// - [`StorageError::ContextLocked`] if creation is locked
    /// - [`StorageError::InvalidArgument`] if `base` is a meta handle
    pub fn layered(
        &self,
        base: &Arc<Storage>,
        layer: Arc<dyn Layer>,
        options: StorageOptions,
    ) -> StorageResult<Arc<Storage>> {
        let mut state = self.state.lock();
        state.check_unlocked()?;
        if let Some(existing) = state.lookup(layer.kind(), base.location(), base.name()) {
            return Err(StorageError::AlreadyRegistered { id: existing.id() });
        }
        Self::layered_locked(&mut state, base, layer, options)
    }

    /// Returns the live layered storage for `base`, creating it if needed.
    ///
    /// # Errors
    ///
    /// See [`StorageRegistry::layered`].
    pub fn get_layered(
        &self,
        base: &Arc<Storage>,
        layer: Arc<dyn Layer>,
        options: StorageOptions,
    ) -> StorageResult<Arc<Storage>> {
        let mut state = self.state.lock();
        state.check_unlocked()?;
        if let Some(existing) = state.lookup(layer.kind(), base.location(), base.name()) {
            return Ok(Arc::clone(existing));
        }
        Self::layered_locked(&mut state, base, layer, options)
    }

    fn layered_locked(
        state: &mut RegistryState,
        base: &Arc<Storage>,
        layer: Arc<dyn Layer>,
        options: StorageOptions,
    ) -> StorageResult<Arc<Storage>> {
        if let Some(tag) = base.meta() {
            return Err(StorageError::InvalidArgument(format!(
                "cannot layer on the '{tag}' sibling of {}",
                base.id()
            )));
        }
        let storage = Arc::new(Storage::on_layer(
            Arc::clone(base),
            layer,
            options,
            state.context.clone(),
        ));
        state.insert(storage.kind(), Arc::clone(&storage));
        state.insert(base.kind(), Arc::clone(&storage));
        debug!(storage = %storage.id(), "registered layered");
        Ok(storage)
    }

    /// Factory for items on `backend`.
    #[must_use]
    pub fn factory(&self, backend: Arc<dyn Backend>, options: StorageOptions) -> StorageFactory {
        StorageFactory::on_backend(self.clone(), backend, options)
    }

    /// Factory layering `layer` on every item of `base`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] if `base` belongs to a
    /// different registry.
    pub fn layered_factory(
        &self,
        base: &StorageFactory,
        layer: Arc<dyn Layer>,
        options: StorageOptions,
    ) -> StorageResult<StorageFactory> {
        if !self.same_as(base.registry()) {
            return Err(StorageError::InvalidArgument(
                "base factory belongs to a different registry".to_string(),
            ));
        }
        Ok(StorageFactory::on_layer(self.clone(), base.clone(), layer, options))
    }

    /// Returns true if both handles share state.
    #[must_use]
    pub fn same_as(&self, other: &StorageRegistry) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Returns true if a storage is live for (kind, location, name).
    #[must_use]
    pub fn is_registered(&self, kind: &str, location: &str, name: &str) -> bool {
        self.state.lock().lookup(kind, location, name).is_some()
    }

    /// All live storages of `kind` at `location`, ordered by name.
    #[must_use]
    pub fn registered(&self, kind: &str, location: &str) -> Vec<Arc<Storage>> {
        self.state
            .lock()
            .entries
            .get(kind)
            .and_then(|locations| locations.get(location))
            .map(|names| names.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Unregisters a storage. A layered storage unregisters its base too.
    pub fn unregister(&self, storage: &Storage) {
        self.state.lock().unregister(storage);
        debug!(storage = %storage.id(), "unregistered");
    }

    /// Drops all registrations and context backups and lifts the lock.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let live: Vec<Arc<Storage>> = state
            .entries
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .cloned()
            .collect();
        for storage in &live {
            state.unregister(storage);
        }
        state.backups.clear();
        state.locked = false;
    }

    /// Current context, empty if none.
    #[must_use]
    pub fn context(&self) -> String {
        self.state.lock().context.clone()
    }

    /// Swaps the registry state for `context`.
    ///
    /// Registrations of the current context are kept aside and restored
    /// when switching back. Leaving a context for the empty context locks
    /// storage creation until a non-empty context is entered again.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ContextSwitch`] if storages were created
    /// without a context.
    pub fn switch_context(&self, context: &str) -> StorageResult<()> {
        let mut state = self.state.lock();
        if state.context.is_empty() && !state.entries.is_empty() {
            let kinds: Vec<&str> = state.entries.keys().map(String::as_str).collect();
            return Err(StorageError::ContextSwitch {
                kinds: kinds.join(", "),
            });
        }
        if !state.context.is_empty() {
            let current = mem::take(&mut state.entries);
            let key = state.context.clone();
            state.backups.insert(key, current);
        }
        state.entries = state.backups.remove(context).unwrap_or_default();
        if !state.context.is_empty() && context.is_empty() {
            state.locked = true;
        }
        if !context.is_empty() {
            state.locked = false;
        }
        debug!(from = %state.context, to = context, "context switched");
        state.context = context.to_string();
        Ok(())
    }

    /// Defines the serializer for a meta tag.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MetaSerializerDefined`] if the tag already
    /// has a serializer.
    pub fn set_meta_serializer(&self, tag: &str, serializer: SerializerKind) -> StorageResult<()> {
        let mut table = self.meta_serializers.write();
        if let Some(existing) = table.get(tag) {
            return Err(StorageError::MetaSerializerDefined {
                tag: tag.to_string(),
                serializer: existing.to_string(),
            });
        }
        table.insert(tag.to_string(), serializer);
        Ok(())
    }

    /// Serializer defined for a meta tag.
    #[must_use]
    pub fn meta_serializer(&self, tag: &str) -> Option<SerializerKind> {
        self.meta_serializers.read().get(tag).copied()
    }
}
