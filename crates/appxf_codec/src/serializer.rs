//! Serializer trait and the three shipped variants.

use crate::decoder::from_compact;
use crate::encoder::to_compact;
use crate::error::{CodecError, CodecResult};
use crate::json::{from_json, to_json};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Converts values to bytes and back.
///
/// Implementations are pure and mutually inverse over the values they
/// accept: `deserialize(serialize(v)) == v`.
pub trait Serializer: Send + Sync {
    /// Encode a value.
    fn serialize(&self, value: &Value) -> CodecResult<Vec<u8>>;

    /// Decode bytes produced by [`Serializer::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> CodecResult<Value>;
}

/// Compact binary serializer (tagged CBOR subset).
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactSerializer;

impl Serializer for CompactSerializer {
    fn serialize(&self, value: &Value) -> CodecResult<Vec<u8>> {
        to_compact(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        from_compact(bytes)
    }
}

/// Human-readable JSON serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> CodecResult<Vec<u8>> {
        to_json(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        from_json(bytes)
    }
}

/// Passthrough serializer restricted to [`Value::Bytes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl Serializer for RawSerializer {
    fn serialize(&self, value: &Value) -> CodecResult<Vec<u8>> {
        match value {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            other => Err(CodecError::unsupported_type(
                other.type_name(),
                "raw serializer only accepts bytes",
            )),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        Ok(Value::Bytes(bytes.to_vec()))
    }
}

/// Selects one of the shipped serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SerializerKind {
    /// [`CompactSerializer`]
    #[default]
    Compact,
    /// [`JsonSerializer`]
    Json,
    /// [`RawSerializer`]
    Raw,
}

impl SerializerKind {
    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            SerializerKind::Compact => "compact",
            SerializerKind::Json => "json",
            SerializerKind::Raw => "raw",
        }
    }
}

impl Serializer for SerializerKind {
    fn serialize(&self, value: &Value) -> CodecResult<Vec<u8>> {
        match self {
            SerializerKind::Compact => CompactSerializer.serialize(value),
            SerializerKind::Json => JsonSerializer.serialize(value),
            SerializerKind::Raw => RawSerializer.serialize(value),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        match self {
            SerializerKind::Compact => CompactSerializer.deserialize(bytes),
            SerializerKind::Json => JsonSerializer.deserialize(bytes),
            SerializerKind::Raw => RawSerializer.deserialize(bytes),
        }
    }
}

impl fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SerializerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(SerializerKind::Compact),
            "json" => Ok(SerializerKind::Json),
            "raw" => Ok(SerializerKind::Raw),
            other => Err(format!("unknown serializer '{other}' (compact, json, raw)")),
        }
    }
}
