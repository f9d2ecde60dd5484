//! Compact binary encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::{MAX_DEPTH, TAG_SET, TAG_TUPLE};

/// Encode a value to compact bytes.
///
/// The output is a CBOR subset (RFC 8949):
/// - Integers and lengths use the shortest possible argument
/// - Floats are always encoded as 64-bit (`0xfb`)
/// - Maps keep their insertion order
/// - Sets and tuples are wrapped in tags 258 and 1000
/// - No indefinite-length encoding
///
/// # Errors
///
/// Returns an error if the value nests deeper than [`MAX_DEPTH`].
pub fn to_compact(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CompactEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A compact binary encoder.
pub struct CompactEncoder {
    buffer: Vec<u8>,
    depth: usize,
}

impl CompactEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            depth: 0,
        }
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => {
                // CBOR null is simple value 22 (0xf6)
                self.buffer.push(0xf6);
                Ok(())
            }
            Value::Bool(b) => {
                self.buffer.push(if *b { 0xf5 } else { 0xf4 });
                Ok(())
            }
            Value::Integer(n) => {
                self.encode_integer(*n);
                Ok(())
            }
            Value::Float(f) => {
                self.buffer.push(0xfb);
                self.buffer.extend_from_slice(&f.to_bits().to_be_bytes());
                Ok(())
            }
            Value::Bytes(b) => {
                self.encode_unsigned(2, b.len() as u64);
                self.buffer.extend_from_slice(b);
                Ok(())
            }
            Value::Text(s) => {
                self.encode_unsigned(3, s.len() as u64);
                self.buffer.extend_from_slice(s.as_bytes());
                Ok(())
            }
            Value::List(items) => self.nested(|enc| enc.encode_array(items)),
            Value::Tuple(items) => self.nested(|enc| {
                enc.encode_unsigned(6, TAG_TUPLE);
                enc.encode_array(items)
            }),
            Value::Set(items) => self.nested(|enc| {
                enc.encode_unsigned(6, TAG_SET);
                enc.encode_array(items)
            }),
            Value::Map(pairs) => self.nested(|enc| enc.encode_map(pairs)),
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> CodecResult<()>,
    ) -> CodecResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CodecError::DepthExceeded { max: MAX_DEPTH });
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_unsigned(0, n as u64);
        } else {
            // CBOR negative integers encode -(n+1); for n in [-2^63, -1]
            // the argument lands in [0, 2^63-1]
            let abs_minus_one = (-(n + 1)) as u64;
            self.encode_unsigned(1, abs_minus_one);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_unsigned(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn encode_array(&mut self, items: &[Value]) -> CodecResult<()> {
        self.encode_unsigned(4, items.len() as u64);
        for item in items {
            self.encode(item)?;
        }
        Ok(())
    }

    fn encode_map(&mut self, pairs: &[(Value, Value)]) -> CodecResult<()> {
        self.encode_unsigned(5, pairs.len() as u64);
        for (key, value) in pairs {
            self.encode(key)?;
            self.encode(value)?;
        }
        Ok(())
    }
}

impl Default for CompactEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_simple_values() {
        assert_eq!(to_compact(&Value::Null).unwrap(), vec![0xf6]);
        assert_eq!(to_compact(&Value::Bool(false)).unwrap(), vec![0xf4]);
        assert_eq!(to_compact(&Value::Bool(true)).unwrap(), vec![0xf5]);
    }

    #[test]
    fn encode_integers_shortest_form() {
        assert_eq!(to_compact(&Value::Integer(0)).unwrap(), vec![0x00]);
        assert_eq!(to_compact(&Value::Integer(23)).unwrap(), vec![0x17]);
        assert_eq!(to_compact(&Value::Integer(24)).unwrap(), vec![0x18, 24]);
        assert_eq!(
            to_compact(&Value::Integer(256)).unwrap(),
            vec![0x19, 0x01, 0x00]
        );
        assert_eq!(
            to_compact(&Value::Integer(65536)).unwrap(),
            vec![0x1a, 0x00, 0x01, 0x00, 0x00]
        );
        assert_eq!(to_compact(&Value::Integer(-1)).unwrap(), vec![0x20]);
        assert_eq!(to_compact(&Value::Integer(-100)).unwrap(), vec![0x38, 99]);
    }

    #[test]
    fn encode_float_is_always_64_bit() {
        let bytes = to_compact(&Value::Float(1.5)).unwrap();
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], 0xfb);
        assert_eq!(&bytes[1..], &1.5f64.to_bits().to_be_bytes());
    }

    #[test]
    fn encode_text_and_bytes() {
        assert_eq!(
            to_compact(&Value::Text("a".into())).unwrap(),
            vec![0x61, b'a']
        );
        assert_eq!(
            to_compact(&Value::Bytes(vec![1, 2, 3])).unwrap(),
            vec![0x43, 1, 2, 3]
        );
    }

    #[test]
    fn encode_map_keeps_insertion_order() {
        let map = Value::Map(vec![
            (Value::Text("bb".into()), Value::Integer(2)),
            (Value::Text("a".into()), Value::Integer(1)),
        ]);
        let bytes = to_compact(&map).unwrap();
        assert_eq!(bytes, vec![0xa2, 0x62, b'b', b'b', 0x02, 0x61, b'a', 0x01]);
    }

    #[test]
    fn encode_set_and_tuple_are_tagged() {
        let set = to_compact(&Value::Set(vec![Value::Integer(1)])).unwrap();
        // tag 258 = 0xd9 0x01 0x02
        assert_eq!(set, vec![0xd9, 0x01, 0x02, 0x81, 0x01]);

        let tuple = to_compact(&Value::Tuple(vec![])).unwrap();
        // tag 1000 = 0xd9 0x03 0xe8
        assert_eq!(tuple, vec![0xd9, 0x03, 0xe8, 0x80]);
    }

    #[test]
    fn encode_rejects_excessive_depth() {
        let mut value = Value::Null;
        for _ in 0..=MAX_DEPTH {
            value = Value::List(vec![value]);
        }
        assert_eq!(
            to_compact(&value),
            Err(CodecError::DepthExceeded { max: MAX_DEPTH })
        );
    }
}
