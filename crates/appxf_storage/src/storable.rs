//! Types that know *what* to store.

use crate::error::{StorageError, StorageResult};
use appxf_codec::Value;

/// A type persisted through a [`crate::Storage`].
///
/// The storage decides *how* bytes are written; the storable decides
/// *what* is written by converting itself to and from a [`Value`].
/// Include a version field in the state when the layout may evolve.
pub trait Storable: Sized {
    /// Captures the state to store.
    fn to_state(&self) -> Value;

    /// Rebuilds an instance from a loaded state.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if the state has an unexpected
    /// shape.
    fn from_state(state: Value) -> StorageResult<Self>;
}

/// Borrows the map entries of a state or fails with `Corrupted`.
pub(crate) fn state_map<'a>(state: &'a Value, what: &str) -> StorageResult<&'a [(Value, Value)]> {
    state
        .as_map()
        .ok_or_else(|| StorageError::corrupted(format!("{what} state is a {}", state.type_name())))
}
