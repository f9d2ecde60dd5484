//! Human-readable JSON encoding of the value domain.
//!
//! Plain JSON covers null, booleans, numbers, strings, arrays and objects
//! with string keys. Everything else is wrapped into a single-key object
//! whose key names the wrapped type:
//!
//! | Value                      | JSON                              |
//! |----------------------------|-----------------------------------|
//! | `Bytes(b)`                 | `{"__bytes__": "<base64>"}`       |
//! | `Tuple(items)`             | `{"__tuple__": [..]}`             |
//! | `Set(items)`               | `{"__set__": [..]}`               |
//! | map with non-text keys     | `{"__map__": [[k, v], ..]}`       |

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::{Map, Number, Value as Json};

const TAG_BYTES: &str = "__bytes__";
const TAG_TUPLE: &str = "__tuple__";
const TAG_SET: &str = "__set__";
const TAG_MAP: &str = "__map__";
const TAGS: [&str; 4] = [TAG_BYTES, TAG_TUPLE, TAG_SET, TAG_MAP];

/// Deepest array/object nesting [`from_json`] reads back.
///
/// Tagged wrappers cost extra levels: a tuple or set takes two, a map with
/// non-text keys three.
pub const JSON_MAX_NESTING: usize = 127;

/// Encode a value as pretty-printed JSON bytes (four-space indent).
///
/// # Errors
///
/// - [`CodecError::UnsupportedType`] for non-finite floats
/// - [`CodecError::DepthExceeded`] if the JSON would nest deeper than
///   [`JSON_MAX_NESTING`]
pub fn to_json(value: &Value) -> CodecResult<Vec<u8>> {
    let json = value_to_json(value, 0)?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut serializer)?;
    Ok(out)
}

/// Decode a value from JSON bytes produced by [`to_json`].
///
/// # Errors
///
/// Returns an error for malformed JSON, malformed tagged objects or
/// integers beyond the i64 range.
pub fn from_json(bytes: &[u8]) -> CodecResult<Value> {
    let json: Json = serde_json::from_slice(bytes)?;
    json_to_value(json)
}

/// Nesting level of a container opened inside `depth` enclosing ones.
fn open(depth: usize) -> CodecResult<usize> {
    let level = depth + 1;
    if level > JSON_MAX_NESTING {
        return Err(CodecError::DepthExceeded {
            max: JSON_MAX_NESTING,
        });
    }
    Ok(level)
}

/// `depth` is the number of arrays/objects enclosing `value`.
fn value_to_json(value: &Value, depth: usize) -> CodecResult<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::Number(Number::from(*n)),
        Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or_else(|| {
            CodecError::unsupported_type("float", format!("{f} has no JSON representation"))
        })?),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => {
            open(depth)?;
            tagged(TAG_BYTES, Json::String(STANDARD.encode(b)))
        }
        Value::List(items) => Json::Array(array(items, open(depth)?)?),
        Value::Tuple(items) => {
            let inner = open(open(depth)?)?;
            tagged(TAG_TUPLE, Json::Array(array(items, inner)?))
        }
        Value::Set(items) => {
            let inner = open(open(depth)?)?;
            tagged(TAG_SET, Json::Array(array(items, inner)?))
        }
        Value::Map(pairs) => map_to_json(pairs, depth)?,
    })
}

fn array(items: &[Value], depth: usize) -> CodecResult<Vec<Json>> {
    items.iter().map(|item| value_to_json(item, depth)).collect()
}

fn tagged(tag: &str, inner: Json) -> Json {
    let mut object = Map::with_capacity(1);
    object.insert(tag.to_string(), inner);
    Json::Object(object)
}

fn map_to_json(pairs: &[(Value, Value)], depth: usize) -> CodecResult<Json> {
    let object_level = open(depth)?;
    if plain_object_possible(pairs) {
        let mut object = Map::with_capacity(pairs.len());
        for (key, value) in pairs {
            if let Value::Text(key) = key {
                object.insert(key.clone(), value_to_json(value, object_level)?);
            }
        }
        return Ok(Json::Object(object));
    }
    let pair_level = open(open(object_level)?)?;
    let entries = pairs
        .iter()
        .map(|(k, v)| {
            Ok(Json::Array(vec![
                value_to_json(k, pair_level)?,
                value_to_json(v, pair_level)?,
            ]))
        })
        .collect::<CodecResult<Vec<_>>>()?;
    Ok(tagged(TAG_MAP, Json::Array(entries)))
}

/// A map becomes a plain object only if all keys are unique text and the
/// result cannot be mistaken for a tagged wrapper.
fn plain_object_possible(pairs: &[(Value, Value)]) -> bool {
    let mut keys: Vec<&str> = Vec::with_capacity(pairs.len());
    for (key, _) in pairs {
        match key {
            Value::Text(k) if !keys.contains(&k.as_str()) => keys.push(k),
            _ => return false,
        }
    }
    !(keys.len() == 1 && TAGS.contains(&keys[0]))
}

fn json_to_value(json: Json) -> CodecResult<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_to_value(&n)?,
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::List(items_to_values(items)?),
        Json::Object(object) => object_to_value(object)?,
    })
}

fn number_to_value(n: &Number) -> CodecResult<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Integer(i));
    }
    if n.is_u64() {
        return Err(CodecError::IntegerOverflow);
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| CodecError::invalid_structure(format!("unrepresentable number {n}")))
}

fn items_to_values(items: Vec<Json>) -> CodecResult<Vec<Value>> {
    items.into_iter().map(json_to_value).collect()
}

fn object_to_value(object: Map<String, Json>) -> CodecResult<Value> {
    if object.len() == 1 {
        if let Some((key, inner)) = object.iter().next() {
            if TAGS.contains(&key.as_str()) {
                return untag(key, inner.clone());
            }
        }
    }
    let pairs = object
        .into_iter()
        .map(|(k, v)| Ok((Value::Text(k), json_to_value(v)?)))
        .collect::<CodecResult<Vec<_>>>()?;
    Ok(Value::Map(pairs))
}

fn untag(tag: &str, inner: Json) -> CodecResult<Value> {
    match (tag, inner) {
        (TAG_BYTES, Json::String(encoded)) => STANDARD
            .decode(encoded.as_bytes())
            .map(Value::Bytes)
            .map_err(|e| CodecError::invalid_structure(format!("invalid base64: {e}"))),
        (TAG_TUPLE, Json::Array(items)) => Ok(Value::Tuple(items_to_values(items)?)),
        (TAG_SET, Json::Array(items)) => Ok(Value::Set(items_to_values(items)?)),
        (TAG_MAP, Json::Array(entries)) => {
            let pairs = entries
                .into_iter()
                .map(|entry| match entry {
                    Json::Array(mut kv) if kv.len() == 2 => {
                        let value = kv.pop().unwrap_or(Json::Null);
                        let key = kv.pop().unwrap_or(Json::Null);
                        Ok((json_to_value(key)?, json_to_value(value)?))
                    }
                    _ => Err(CodecError::invalid_structure(
                        "map entries must be [key, value] pairs",
                    )),
                })
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(Value::Map(pairs))
        }
        (tag, _) => Err(CodecError::invalid_structure(format!(
            "malformed payload for {tag}"
        ))),
    }
}
