//! In-memory storage backend for testing.

use crate::backend::{Backend, ItemRef};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

type ItemKey = (String, Option<String>);

/// A named RAM area.
///
/// Suitable for:
/// - Unit tests
/// - Integration tests simulating several locations in one process
/// - Ephemeral data that doesn't need persistence
///
/// Clones share the same data, so a test can keep a handle to inspect what
/// a [`crate::Storage`] wrote.
///
/// # Example
///
/// ```rust
/// use appxf_storage::{Backend, InMemoryBackend, ItemRef};
///
/// let backend = InMemoryBackend::new("ram-a");
/// backend.store_raw(ItemRef::primary("foo"), b"test data").unwrap();
/// assert!(backend.exists(ItemRef::primary("foo")).unwrap());
/// assert_eq!(backend.load_raw(ItemRef::primary("bar")).unwrap(), b"");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    area: String,
    items: Arc<RwLock<BTreeMap<ItemKey, Vec<u8>>>>,
}

impl InMemoryBackend {
    /// Kind reported by this backend.
    pub const KIND: &'static str = "RamStorage";

    /// Creates a new empty RAM area.
    #[must_use]
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            items: Arc::default(),
        }
    }

    /// Names of all primary items, sorted.
    #[must_use]
    pub fn item_names(&self) -> Vec<String> {
        self.items
            .read()
            .keys()
            .filter(|(_, meta)| meta.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of stored blobs, auxiliary siblings included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing was stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn key(item: ItemRef<'_>) -> ItemKey {
        (item.name.to_string(), item.meta.map(str::to_string))
    }
}

impl Backend for InMemoryBackend {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn location(&self) -> &str {
        &self.area
    }

    fn exists(&self, item: ItemRef<'_>) -> StorageResult<bool> {
        Ok(self.items.read().contains_key(&Self::key(item)))
    }

    fn store_raw(&self, item: ItemRef<'_>, data: &[u8]) -> StorageResult<()> {
        self.items.write().insert(Self::key(item), data.to_vec());
        Ok(())
    }

    fn load_raw(&self, item: ItemRef<'_>) -> StorageResult<Vec<u8>> {
        Ok(self
            .items
            .read()
            .get(&Self::key(item))
            .cloned()
            .unwrap_or_default())
    }

    fn remove(&self, item: ItemRef<'_>) -> StorageResult<()> {
        self.items.write().remove(&Self::key(item));
        Ok(())
    }
}
