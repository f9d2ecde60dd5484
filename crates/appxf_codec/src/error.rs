//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during serialization or deserialization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The serializer cannot carry this kind of value.
    #[error("cannot serialize {type_name}: {reason}")]
    UnsupportedType {
        /// Name of the offending value variant.
        type_name: String,
        /// Why the serializer refuses it.
        reason: String,
    },

    /// Encoded input names a type outside the allow-list.
    #[error("disallowed type in encoded data: {description}")]
    DisallowedTag {
        /// Description of the rejected construct.
        description: String,
    },

    /// Indefinite-length items are forbidden.
    #[error("indefinite-length items are forbidden")]
    IndefiniteLengthForbidden,

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid encoded structure.
    #[error("invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Nesting exceeds the supported depth.
    #[error("nesting depth exceeds {max}")]
    DepthExceeded {
        /// The maximum supported depth.
        max: usize,
    },

    /// Claimed length exceeds allowed maximum.
    #[error("size limit exceeded: claimed {claimed}, max allowed {max_allowed}")]
    SizeLimitExceeded {
        /// The size claimed in the encoded data.
        claimed: u64,
        /// The maximum allowed size.
        max_allowed: u64,
    },

    /// Integer does not fit into the value domain.
    #[error("integer overflow")]
    IntegerOverflow,

    /// The JSON layer rejected the document.
    #[error("json error: {0}")]
    Json(String),
}

impl CodecError {
    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a disallowed tag error.
    pub fn disallowed(description: impl Into<String>) -> Self {
        Self::DisallowedTag {
            description: description.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
