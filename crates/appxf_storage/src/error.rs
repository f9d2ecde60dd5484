//! Error types for storage operations.

use appxf_codec::CodecError;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A live storage already exists for this kind, location and name.
    #[error("{id} is already registered")]
    AlreadyRegistered {
        /// Identifier of the conflicting storage.
        id: String,
    },

    /// Storage creation is blocked after leaving a context.
    #[error(
        "storage creation is locked: switch_context(\"\") was called after \
         using contexts; keep a valid context instead"
    )]
    ContextLocked,

    /// Switching context would orphan storages created without a context.
    #[error("context switch not allowed, storages exist without context for: {kinds}")]
    ContextSwitch {
        /// Storage kinds with live registrations.
        kinds: String,
    },

    /// The requested item does not exist.
    #[error("{id} does not exist")]
    NotFound {
        /// Identifier of the missing storage.
        id: String,
    },

    /// An existing item carries no metadata record.
    #[error("{id} exists but has no metadata")]
    MissingMetaData {
        /// Identifier of the storage.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encryption or decryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Arguments to a constructor or factory are not compatible.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A serializer for this meta tag was defined before.
    #[error("serializer {serializer} is already defined for meta tag '{tag}'")]
    MetaSerializerDefined {
        /// The meta tag.
        tag: String,
        /// The serializer already in place.
        serializer: String,
    },

    /// A stored record does not have the expected shape.
    #[error("stored state corrupted: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Creates a corrupted-state error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an encryption error.
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption(message.into())
    }

    /// Returns true for errors a reconnect may resolve.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
