//! Storage handles for one named item at one location.

use crate::backend::{Backend, ItemRef};
use crate::encrypted::Layer;
use crate::error::{StorageError, StorageResult};
use crate::meta_data::MetaData;
use crate::storable::Storable;
use appxf_codec::{Serializer, SerializerKind, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Meta tag of the metadata record.
pub const META_TAG: &str = "meta";

/// Meta tag of the synchronization record.
pub const SYNC_TAG: &str = "sync";

/// Serializer overrides per meta tag, shared by every storage of a registry.
pub(crate) type MetaSerializers = Arc<RwLock<BTreeMap<String, SerializerKind>>>;

/// Per-storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageOptions {
    /// Serializer for primary content.
    pub serializer: SerializerKind,
    /// Application user accessing a shared location. Empty if unused.
    pub user: String,
}

impl StorageOptions {
    /// Default options: compact serializer, no user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the serializer for primary content.
    #[must_use]
    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    /// Sets the accessing user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

#[derive(Debug, Clone)]
enum Access {
    Backend(Arc<dyn Backend>),
    Layer {
        layer: Arc<dyn Layer>,
        base: Arc<Storage>,
    },
}

/// One storable blob at one (location, name) pair.
///
/// Storages are created through a [`crate::StorageRegistry`], which keeps
/// at most one live handle per kind, location and name. All behavior
/// above raw bytes lives here:
///
/// - serialization with the configured [`SerializerKind`]
/// - a fresh [`MetaData`] record on every [`Storage::store`]
/// - auxiliary siblings via [`Storage::get_meta`]
///
/// A layered storage (see [`crate::StorageRegistry::layered`]) transforms
/// its primary content and hands it to its base. Auxiliary siblings are
/// always addressed at the root of the chain and never pass through
/// layers.
#[derive(Debug, Clone)]
pub struct Storage {
    kind: String,
    name: String,
    location: String,
    user: String,
    context: String,
    meta: Option<String>,
    serializer: SerializerKind,
    access: Access,
    meta_serializers: MetaSerializers,
}

impl Storage {
    pub(crate) fn on_backend(
        backend: Arc<dyn Backend>,
        name: &str,
        options: StorageOptions,
        context: String,
        meta_serializers: MetaSerializers,
    ) -> Self {
        Self {
            kind: backend.kind().to_string(),
            name: name.to_string(),
            location: backend.location().to_string(),
            user: options.user,
            context,
            meta: None,
            serializer: options.serializer,
            access: Access::Backend(backend),
            meta_serializers,
        }
    }

    pub(crate) fn on_layer(
        base: Arc<Storage>,
        layer: Arc<dyn Layer>,
        options: StorageOptions,
        context: String,
    ) -> Self {
        Self {
            kind: layer.kind().to_string(),
            name: base.name.clone(),
            location: base.location.clone(),
            user: options.user,
            context,
            meta: None,
            serializer: options.serializer,
            meta_serializers: Arc::clone(&base.meta_serializers),
            access: Access::Layer { layer, base },
        }
    }

    /// Storage kind (backend or layer kind).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Name of the item within its location.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the physical location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Accessing user, empty if unused.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Registry context at creation, empty if none.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Meta tag if this handle addresses an auxiliary sibling.
    #[must_use]
    pub fn meta(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// Serializer for primary content.
    #[must_use]
    pub fn serializer(&self) -> SerializerKind {
        self.serializer
    }

    /// The storage this one is layered on.
    #[must_use]
    pub fn base(&self) -> Option<&Arc<Storage>> {
        match &self.access {
            Access::Backend(_) => None,
            Access::Layer { base, .. } => Some(base),
        }
    }

    /// The backend at the root of the chain.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        match &self.access {
            Access::Backend(backend) => backend,
            Access::Layer { base, .. } => base.backend(),
        }
    }

    fn root(&self) -> &Storage {
        match &self.access {
            Access::Backend(_) => self,
            Access::Layer { base, .. } => base.root(),
        }
    }

    fn item(&self) -> ItemRef<'_> {
        ItemRef {
            name: &self.name,
            meta: self.meta.as_deref(),
        }
    }

    /// Identifier for logging, never used for decisions.
    ///
    /// `Kind(location): name`, `Kind(user, location): name`,
    /// `Kind on <base id>` or `Kind(user) on <base id>`, followed by
    /// ` (Context: c)` when created inside a context.
    #[must_use]
    pub fn id(&self) -> String {
        let context = if self.context.is_empty() {
            String::new()
        } else {
            format!(" (Context: {})", self.context)
        };
        match (self.base(), self.user.is_empty()) {
            (Some(base), true) => format!("{} on {}{}", self.kind, base.id(), context),
            (Some(base), false) => {
                format!("{}({}) on {}{}", self.kind, self.user, base.id(), context)
            }
            (None, true) => format!("{}({}): {}{}", self.kind, self.location, self.name, context),
            (None, false) => format!(
                "{}({}, {}): {}{}",
                self.kind, self.user, self.location, self.name, context
            ),
        }
    }

    /// Returns true if the primary blob (or this sibling) is present.
    ///
    /// # Errors
    ///
    /// Returns an error only if presence cannot be determined.
    pub fn exists(&self) -> StorageResult<bool> {
        match &self.access {
            Access::Backend(backend) => backend.exists(self.item()),
            Access::Layer { base, .. } => base.exists(),
        }
    }

    /// Writes bytes as they are, through all layers.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer or the backend fails.
    pub fn store_raw(&self, data: &[u8]) -> StorageResult<()> {
        match &self.access {
            Access::Backend(backend) => backend.store_raw(self.item(), data),
            Access::Layer { layer, base } => base.store_raw(&layer.seal(data)?),
        }
    }

    /// Reads bytes through all layers. Empty if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer or the backend fails.
    pub fn load_raw(&self) -> StorageResult<Vec<u8>> {
        match &self.access {
            Access::Backend(backend) => backend.load_raw(self.item()),
            Access::Layer { layer, base } => {
                let sealed = base.load_raw()?;
                if sealed.is_empty() {
                    return Ok(sealed);
                }
                layer.open(&sealed)
            }
        }
    }

    fn effective_serializer(&self) -> SerializerKind {
        self.meta
            .as_ref()
            .and_then(|tag| self.meta_serializers.read().get(tag).copied())
            .unwrap_or(self.serializer)
    }

    /// Loads and deserializes the value, [`Value::Null`] if nothing exists.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserializing fails.
    pub fn load(&self) -> StorageResult<Value> {
        let raw = self.load_raw()?;
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        Ok(self.effective_serializer().deserialize(&raw)?)
    }

    /// Serializes and stores a value.
    ///
    /// Unless this handle is a meta sibling, a fresh [`MetaData`] record is
    /// written first. The two writes are not atomic: a failing content
    /// write after a successful metadata write is returned as an error.
    ///
    /// With the raw serializer, [`Value::Null`] is stored as empty content,
    /// which [`Storage::load`] reads back as `Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if serializing or any write fails.
    pub fn store(&self, value: &Value) -> StorageResult<()> {
        let raw = match (self.effective_serializer(), value) {
            (SerializerKind::Raw, Value::Null) => Vec::new(),
            (serializer, value) => serializer.serialize(value)?,
        };
        if self.meta.is_none() {
            self.set_meta_data(&MetaData::new())?;
        }
        self.store_raw(&raw)?;
        debug!(storage = %self.id(), meta = ?self.meta, bytes = raw.len(), "stored");
        Ok(())
    }

    /// Handle for the `tag` sibling of this item.
    ///
    /// The handle is rooted at the base of a layered chain, is not
    /// registered and loads/stores independently of the primary item.
    #[must_use]
    pub fn get_meta(&self, tag: &str) -> Storage {
        let mut meta = self.root().clone();
        meta.meta = Some(tag.to_string());
        meta
    }

    /// Reads the metadata record, `None` if it was never stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or is malformed.
    pub fn get_meta_data(&self) -> StorageResult<Option<MetaData>> {
        let meta = self.get_meta(META_TAG);
        if !meta.exists()? {
            return Ok(None);
        }
        Ok(Some(MetaData::from_state(meta.load()?)?))
    }

    /// Like [`Storage::get_meta_data`], but a missing record is an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingMetaData`] if no record exists.
    pub fn require_meta_data(&self) -> StorageResult<MetaData> {
        self.get_meta_data()?
            .ok_or_else(|| StorageError::MissingMetaData { id: self.id() })
    }

    /// Writes the metadata record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_meta_data(&self, meta: &MetaData) -> StorageResult<()> {
        self.get_meta(META_TAG).store(&meta.to_state())
    }

    /// Stores a [`Storable`].
    ///
    /// # Errors
    ///
    /// See [`Storage::store`].
    pub fn store_storable<S: Storable>(&self, storable: &S) -> StorageResult<()> {
        self.store(&storable.to_state())
    }

    /// Loads a [`Storable`]. Missing data is an error here.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing was stored, or the
    /// storable's own error for malformed state.
    pub fn load_storable<S: Storable>(&self) -> StorageResult<S> {
        if !self.exists()? {
            return Err(StorageError::NotFound { id: self.id() });
        }
        S::from_state(self.load()?)
    }

    /// Deletes the item together with its known siblings.
    ///
    /// On a meta handle only that sibling is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend delete fails.
    pub fn remove(&self) -> StorageResult<()> {
        if self.meta.is_some() {
            return self.backend().remove(self.item());
        }
        let root = self.root();
        let backend = root.backend();
        backend.remove(root.item())?;
        let mut tags: Vec<String> = self.meta_serializers.read().keys().cloned().collect();
        for tag in [META_TAG, SYNC_TAG] {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        for tag in &tags {
            backend.remove(ItemRef::meta(&root.name, tag))?;
        }
        debug!(storage = %self.id(), "removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypted::{EncryptionKey, EncryptionLayer};
    use crate::local::LocalBackend;
    use crate::memory::InMemoryBackend;
    use crate::registry::StorageRegistry;
    use tempfile::tempdir;

    fn ram(registry: &StorageRegistry, area: &InMemoryBackend, name: &str) -> Arc<Storage> {
        registry
            .create(Arc::new(area.clone()), name, StorageOptions::new())
            .unwrap()
    }

    #[test]
    fn missing_item_loads_null() {
        let registry = StorageRegistry::new();
        let storage = ram(&registry, &InMemoryBackend::new("a"), "foo");
        assert!(!storage.exists().unwrap());
        assert_eq!(storage.load().unwrap(), Value::Null);
        assert_eq!(storage.get_meta_data().unwrap(), None);
    }

    #[test]
    fn store_load_roundtrip() {
        let registry = StorageRegistry::new();
        let storage = ram(&registry, &InMemoryBackend::new("a"), "foo");
        let value = Value::text_map([("x", Value::Integer(1))]);
        storage.store(&value).unwrap();
        assert!(storage.exists().unwrap());
        assert_eq!(storage.load().unwrap(), value);
    }

    #[test]
    fn store_refreshes_uuid_even_for_same_content() {
        let registry = StorageRegistry::new();
        let storage = ram(&registry, &InMemoryBackend::new("a"), "foo");
        let value = Value::Bytes(b"same".to_vec());

        storage.store(&value).unwrap();
        let first = storage.get_meta_data().unwrap().unwrap();
        storage.store(&value).unwrap();
        let second = storage.get_meta_data().unwrap().unwrap();
        assert_ne!(first.uuid, second.uuid);
    }

    #[test]
    fn meta_storage_does_not_write_metadata() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let storage = ram(&registry, &area, "foo");

        storage.get_meta("notes").store(&Value::from("x")).unwrap();
        assert_eq!(area.len(), 1);
        assert!(!storage.exists().unwrap());
        assert!(storage.get_meta("notes").exists().unwrap());
    }

    #[test]
    fn metadata_is_json_regardless_of_serializer() {
        let dir = tempdir().unwrap();
        let registry = StorageRegistry::new();
        let backend = Arc::new(LocalBackend::open(dir.path()).unwrap());
        let storage = registry.create(backend, "foo", StorageOptions::new()).unwrap();
        storage.store(&Value::Integer(5)).unwrap();

        let meta_file = std::fs::read(dir.path().join(".meta").join("foo.meta")).unwrap();
        let text = String::from_utf8(meta_file).unwrap();
        assert!(text.starts_with("{\n    \"version\": 1,"), "{text}");
        assert!(text.contains("__bytes__"));
    }

    #[test]
    fn refused_value_leaves_storage_untouched() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let storage = registry
            .create(
                Arc::new(area.clone()),
                "raw",
                StorageOptions::new().with_serializer(SerializerKind::Raw),
            )
            .unwrap();

        let result = storage.store(&Value::Integer(1));
        assert!(matches!(result, Err(StorageError::Codec(_))));
        assert!(area.is_empty());
    }

    #[test]
    fn layered_storage_encrypts_content_only() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let base = ram(&registry, &area, "secret");
        let layer = Arc::new(EncryptionLayer::new(EncryptionKey::generate()));
        let secure = registry.layered(&base, layer, StorageOptions::new()).unwrap();

        let value = Value::from("plain text");
        secure.store(&value).unwrap();
        assert_eq!(secure.load().unwrap(), value);

        // base sees ciphertext, metadata stays readable at the root
        let sealed = base.load_raw().unwrap();
        assert!(!sealed.windows(10).any(|w| w == b"plain text"));
        let meta = base.get_meta_data().unwrap().unwrap();
        assert_eq!(secure.get_meta_data().unwrap().unwrap(), meta);
    }

    #[test]
    fn id_formats() {
        let registry = StorageRegistry::new();
        let area = Arc::new(InMemoryBackend::new("area"));
        let plain = registry
            .create(area.clone(), "foo", StorageOptions::new())
            .unwrap();
        assert_eq!(plain.id(), "RamStorage(area): foo");

        let with_user = registry
            .create(area, "bar", StorageOptions::new().with_user("alice"))
            .unwrap();
        assert_eq!(with_user.id(), "RamStorage(alice, area): bar");

        let layer = Arc::new(EncryptionLayer::new(EncryptionKey::generate()));
        let secure = registry
            .layered(&plain, layer.clone(), StorageOptions::new())
            .unwrap();
        assert_eq!(secure.id(), "EncryptedStorage on RamStorage(area): foo");

        let shared = registry
            .layered(&with_user, layer, StorageOptions::new().with_user("bob"))
            .unwrap();
        assert_eq!(
            shared.id(),
            "EncryptedStorage(bob) on RamStorage(alice, area): bar"
        );
    }

    #[test]
    fn id_includes_context() {
        let registry = StorageRegistry::new();
        registry.switch_context("app-1").unwrap();
        let storage = ram(&registry, &InMemoryBackend::new("area"), "foo");
        assert_eq!(storage.id(), "RamStorage(area): foo (Context: app-1)");
    }

    #[derive(Debug, PartialEq)]
    struct Note(String);

    impl Storable for Note {
        fn to_state(&self) -> Value {
            Value::text_map([("text", Value::from(self.0.as_str()))])
        }

        fn from_state(state: Value) -> StorageResult<Self> {
            state
                .get("text")
                .and_then(Value::as_text)
                .map(|t| Note(t.to_string()))
                .ok_or_else(|| StorageError::corrupted("text missing"))
        }
    }

    #[test]
    fn storable_roundtrip_and_missing() {
        let registry = StorageRegistry::new();
        let storage = ram(&registry, &InMemoryBackend::new("a"), "note");

        let missing = storage.load_storable::<Note>();
        assert!(matches!(missing, Err(StorageError::NotFound { .. })));

        storage.store_storable(&Note("hi".into())).unwrap();
        assert_eq!(storage.load_storable::<Note>().unwrap(), Note("hi".into()));
    }

    #[test]
    fn require_meta_data_reports_missing() {
        let registry = StorageRegistry::new();
        let storage = ram(&registry, &InMemoryBackend::new("a"), "foo");
        assert!(matches!(
            storage.require_meta_data(),
            Err(StorageError::MissingMetaData { .. })
        ));
    }

    #[test]
    fn remove_deletes_siblings() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let storage = ram(&registry, &area, "foo");
        storage.store(&Value::Integer(1)).unwrap();
        storage.get_meta(SYNC_TAG).store(&Value::Null).unwrap();
        assert_eq!(area.len(), 3);

        storage.remove().unwrap();
        assert!(area.is_empty());
    }

    #[test]
    fn raw_null_is_stored_as_empty_content() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let storage = registry
            .create(
                Arc::new(area.clone()),
                "empty",
                StorageOptions::new().with_serializer(SerializerKind::Raw),
            )
            .unwrap();

        storage.store(&Value::Bytes(Vec::new())).unwrap();
        assert!(storage.exists().unwrap());
        assert_eq!(storage.load().unwrap(), Value::Null);

        // what load returned can be stored again
        storage.store(&Value::Null).unwrap();
        assert!(storage.exists().unwrap());
        assert!(storage.load_raw().unwrap().is_empty());
        assert!(storage.get_meta_data().unwrap().is_some());
    }

    /// Accepts sibling writes, fails primary content writes.
    #[derive(Debug)]
    struct ContentWriteFails(InMemoryBackend);

    impl Backend for ContentWriteFails {
        fn kind(&self) -> &str {
            self.0.kind()
        }

        fn location(&self) -> &str {
            self.0.location()
        }

        fn exists(&self, item: ItemRef<'_>) -> StorageResult<bool> {
            self.0.exists(item)
        }

        fn store_raw(&self, item: ItemRef<'_>, data: &[u8]) -> StorageResult<()> {
            if item.meta.is_none() {
                return Err(std::io::Error::other("disk full").into());
            }
            self.0.store_raw(item, data)
        }

        fn load_raw(&self, item: ItemRef<'_>) -> StorageResult<Vec<u8>> {
            self.0.load_raw(item)
        }

        fn remove(&self, item: ItemRef<'_>) -> StorageResult<()> {
            self.0.remove(item)
        }
    }

    #[test]
    fn failed_content_write_after_metadata_is_reported() {
        let registry = StorageRegistry::new();
        let area = InMemoryBackend::new("a");
        let storage = registry
            .create(
                Arc::new(ContentWriteFails(area.clone())),
                "foo",
                StorageOptions::new(),
            )
            .unwrap();

        let result = storage.store(&Value::Integer(1));
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!storage.exists().unwrap());
        assert!(storage.get_meta_data().unwrap().is_some());
        assert!(area.exists(ItemRef::meta("foo", META_TAG)).unwrap());
    }
}
