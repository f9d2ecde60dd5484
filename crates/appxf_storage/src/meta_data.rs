//! Per-item metadata used to detect changes between synchronizations.

use crate::error::{StorageError, StorageResult};
use crate::storable::{state_map, Storable};
use appxf_codec::Value;
use chrono::Local;
use uuid::Uuid;

/// Schema version written by [`MetaData::new`].
pub const META_DATA_VERSION: i64 = 1;

/// Format of [`MetaData::timestamp`]: ISO-8601 local time, microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Synchronization-relevant state of one stored item at one location.
///
/// `uuid` is a generation token: every store assigns a new random value,
/// also when the content did not change. It is never a content hash.
/// `timestamp` is informational and never used for decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaData {
    /// Schema version.
    pub version: i64,
    /// Random 16 byte generation token.
    pub uuid: [u8; 16],
    /// Reserved, currently always empty.
    pub hash: Vec<u8>,
    /// Wall-clock time of the store.
    pub timestamp: Option<String>,
}

impl MetaData {
    /// Fresh metadata: new uuid, current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: META_DATA_VERSION,
            uuid: *Uuid::new_v4().as_bytes(),
            hash: Vec::new(),
            timestamp: Some(now_timestamp()),
        }
    }
}

impl Default for MetaData {
    fn default() -> Self {
        Self::new()
    }
}

/// Current local time in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl Storable for MetaData {
    fn to_state(&self) -> Value {
        Value::text_map([
            ("version", Value::Integer(self.version)),
            ("uuid", Value::Bytes(self.uuid.to_vec())),
            ("hash", Value::Bytes(self.hash.clone())),
            ("timestamp", self.timestamp.clone().into()),
        ])
    }

    fn from_state(state: Value) -> StorageResult<Self> {
        state_map(&state, "metadata")?;
        let version = state
            .get("version")
            .or_else(|| state.get("_version"))
            .and_then(Value::as_integer)
            .unwrap_or(META_DATA_VERSION);
        let uuid = state
            .get("uuid")
            .and_then(Value::as_bytes)
            .and_then(|b| <[u8; 16]>::try_from(b).ok())
            .ok_or_else(|| StorageError::corrupted("metadata uuid must be 16 bytes"))?;
        let hash = state
            .get("hash")
            .and_then(Value::as_bytes)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        let timestamp = match state.get("timestamp") {
            None | Some(Value::Null) => None,
            Some(Value::Text(t)) => Some(t.clone()),
            Some(other) => {
                return Err(StorageError::corrupted(format!(
                    "metadata timestamp is a {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self {
            version,
            uuid,
            hash,
            timestamp,
        })
    }
}
