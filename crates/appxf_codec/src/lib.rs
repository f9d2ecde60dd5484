//! # APPXF Codec
//!
//! Serializers that turn structured values into bytes for storage.
//!
//! All serializers share one closed value domain, [`Value`]: booleans,
//! integers, floats, text, byte strings, lists, tuples, sets, ordered maps
//! and null. Decoding never produces anything outside that domain, which is
//! what makes loading bytes from an untrusted location safe.
//!
//! ## Serializers
//!
//! - [`CompactSerializer`] - tagged CBOR subset, small and exact
//! - [`JsonSerializer`] - pretty JSON for files meant to be read by people
//! - [`RawSerializer`] - passes byte strings through unchanged
//!
//! ## Usage
//!
//! ```
//! use appxf_codec::{CompactSerializer, Serializer, Value};
//!
//! let value = Value::text_map([("answer", Value::Integer(42))]);
//! let bytes = CompactSerializer.serialize(&value).unwrap();
//! assert_eq!(CompactSerializer.deserialize(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod json;
mod serializer;
mod value;

pub use decoder::{from_compact, CompactDecoder};
pub use encoder::{to_compact, CompactEncoder};
pub use error::{CodecError, CodecResult};
pub use json::{from_json, to_json, JSON_MAX_NESTING};
pub use serializer::{CompactSerializer, JsonSerializer, RawSerializer, Serializer, SerializerKind};
pub use value::Value;

/// Maximum container nesting accepted by the compact format.
pub const MAX_DEPTH: usize = 64;

/// Compact-format tag marking a set.
pub const TAG_SET: u64 = 258;

/// Compact-format tag marking a tuple.
pub const TAG_TUPLE: u64 = 1000;
