//! Error types for synchronization.

use appxf_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Conflict errors are terminal for the item they name. The sync functions
/// never catch them; a caller looping over items decides whether to skip
/// or abort.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Both sides changed since the last sync between them.
    #[error(
        "storage changed on both sides, resolve manually by removing one side\nA: {a}\nB: {b}"
    )]
    ChangeOnBothSides {
        /// Identifier of side A.
        a: String,
        /// Identifier of side B.
        b: String,
    },

    /// Both sides exist but at least one has no record of the other.
    #[error(
        "storage exists on both locations but a sync record is missing, \
         remove the item from one location\nA: {a}\nB: {b}"
    )]
    MissingSyncRecord {
        /// Identifier of side A.
        a: String,
        /// Identifier of side B.
        b: String,
    },

    /// An existing item carries no metadata.
    #[error("{id} exists but has no metadata")]
    MissingMetaData {
        /// Identifier of the storage.
        id: String,
    },

    /// The two handles address differently named items.
    #[error("cannot sync items with different names: '{a}' and '{b}'")]
    NameMismatch {
        /// Name on side A.
        a: String,
        /// Name on side B.
        b: String,
    },

    /// Storage error while reading or writing a side.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Returns true for the two decision errors that need manual
    /// intervention.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SyncError::ChangeOnBothSides { .. } | SyncError::MissingSyncRecord { .. }
        )
    }
}
