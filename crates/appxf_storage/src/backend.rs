//! Backend trait definition.

use crate::error::StorageResult;
use std::fmt;

/// Addresses one blob inside a backend location.
///
/// `meta == None` is the primary item. `Some(tag)` is the auxiliary sibling
/// for that tag, e.g. the metadata record (`"meta"`) or the sync record
/// (`"sync"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef<'a> {
    /// Name of the item within its location.
    pub name: &'a str,
    /// Meta tag for auxiliary siblings.
    pub meta: Option<&'a str>,
}

impl<'a> ItemRef<'a> {
    /// The primary item `name`.
    #[must_use]
    pub fn primary(name: &'a str) -> Self {
        Self { name, meta: None }
    }

    /// The `tag` sibling of item `name`.
    #[must_use]
    pub fn meta(name: &'a str, tag: &'a str) -> Self {
        Self {
            name,
            meta: Some(tag),
        }
    }
}

impl fmt::Display for ItemRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.meta {
            Some(tag) => write!(f, "{}.{}", self.name, tag),
            None => f.write_str(self.name),
        }
    }
}

/// Raw byte storage for one physical location.
///
/// Backends are **opaque byte stores**. They know nothing about
/// serialization, metadata or synchronization; all of that lives in
/// [`crate::Storage`] and is provided uniformly on top.
///
/// # Invariants
///
/// - `load_raw` returns exactly the bytes last passed to `store_raw`
/// - `load_raw` of an item that was never stored returns empty bytes
/// - `exists` does not fail merely because nothing was stored
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`crate::InMemoryBackend`] - RAM areas, for testing
/// - [`crate::LocalBackend`] - directories on the local file system
/// - [`crate::RetryingBackend`] - reconnecting wrapper for remote backends
pub trait Backend: Send + Sync + fmt::Debug {
    /// Storage kind, used for registry keys and identification.
    fn kind(&self) -> &str;

    /// Unique identifier of the physical location (path, URL, area tag).
    fn location(&self) -> &str;

    /// Returns true if the item is present.
    ///
    /// # Errors
    ///
    /// Returns an error only if presence cannot be determined.
    fn exists(&self, item: ItemRef<'_>) -> StorageResult<bool>;

    /// Replaces the item's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn store_raw(&self, item: ItemRef<'_>, data: &[u8]) -> StorageResult<()>;

    /// Reads the item's bytes, empty if the item does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn load_raw(&self, item: ItemRef<'_>) -> StorageResult<Vec<u8>>;

    /// Deletes the item. Deleting a missing item is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the item exists but cannot be removed.
    fn remove(&self, item: ItemRef<'_>) -> StorageResult<()>;

    /// Identifier for logging. Never used for decisions.
    fn id(&self, item: ItemRef<'_>) -> String {
        format!("{}({}): {}", self.kind(), self.location(), item)
    }
}
