//! Per-item record of the last state agreed with each sync partner.

use appxf_codec::Value;
use appxf_storage::{now_timestamp, Storable, Storage, StorageError, StorageResult, SYNC_TAG};
use std::collections::BTreeMap;

/// Schema version written by this crate.
pub const SYNC_DATA_VERSION: i64 = 2;

/// Last agreed state with one partner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncPair {
    /// Metadata uuid both sides carried after the last sync.
    pub uuid: Vec<u8>,
    /// Time of that sync. Informational only.
    pub timestamp: Option<String>,
}

/// Synchronization record of one item at one location (`<item>.sync`).
///
/// Entries are keyed by `"<this user>--<partner location>"`. An entry for
/// location B in the record at A means: the latest sync between A and B
/// was based on the item state carrying this uuid.
///
/// The record is stored as JSON so it can be inspected by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncData {
    /// Schema version.
    pub version: i64,
    /// Partner key to last agreed state.
    pub storage_pair_map: BTreeMap<String, SyncPair>,
}

impl Default for SyncData {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncData {
    /// An empty record.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: SYNC_DATA_VERSION,
            storage_pair_map: BTreeMap::new(),
        }
    }

    /// Key of `other` in the record kept by `this`.
    #[must_use]
    pub fn pair_key(this: &Storage, other: &Storage) -> String {
        format!("{}--{}", this.user(), other.location())
    }

    /// Uuid agreed with `other`, empty if `other` is unknown.
    #[must_use]
    pub fn location_uuid(&self, this: &Storage, other: &Storage) -> &[u8] {
        self.storage_pair_map
            .get(&Self::pair_key(this, other))
            .map(|pair| pair.uuid.as_slice())
            .unwrap_or(&[])
    }

    /// Records `uuid` as agreed with `other`, stamped with the current time.
    pub fn set_location_uuid(&mut self, this: &Storage, other: &Storage, uuid: &[u8]) {
        let pair = self
            .storage_pair_map
            .entry(Self::pair_key(this, other))
            .or_default();
        pair.uuid = uuid.to_vec();
        pair.timestamp = Some(now_timestamp());
    }

    /// Reads the record kept next to `storage`, empty if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    pub fn load_for(storage: &Storage) -> StorageResult<Self> {
        let meta = storage.get_meta(SYNC_TAG);
        if !meta.exists()? {
            return Ok(Self::new());
        }
        meta.load_storable()
    }

    /// Writes the record next to `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn store_for(&self, storage: &Storage) -> StorageResult<()> {
        storage.get_meta(SYNC_TAG).store_storable(self)
    }
}

fn uuid_from(value: Option<&Value>) -> StorageResult<Vec<u8>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Bytes(b)) => Ok(b.clone()),
        Some(Value::Text(t)) if t.is_empty() => Ok(Vec::new()),
        Some(other) => Err(StorageError::corrupted(format!(
            "sync uuid is a {}",
            other.type_name()
        ))),
    }
}

fn pairs_from(map: &Value) -> StorageResult<BTreeMap<String, SyncPair>> {
    let entries = map
        .as_map()
        .ok_or_else(|| StorageError::corrupted("sync pairs must be a map"))?;
    let mut pairs = BTreeMap::new();
    for (key, entry) in entries {
        let key = key
            .as_text()
            .ok_or_else(|| StorageError::corrupted("sync pair key must be text"))?;
        let timestamp = entry.get("timestamp").and_then(Value::as_text).map(str::to_string);
        pairs.insert(
            key.to_string(),
            SyncPair {
                uuid: uuid_from(entry.get("uuid"))?,
                timestamp,
            },
        );
    }
    Ok(pairs)
}

impl Storable for SyncData {
    fn to_state(&self) -> Value {
        let pairs = self
            .storage_pair_map
            .iter()
            .map(|(key, pair)| {
                (
                    Value::Text(key.clone()),
                    Value::text_map([
                        ("uuid", Value::Bytes(pair.uuid.clone())),
                        ("timestamp", pair.timestamp.clone().into()),
                    ]),
                )
            })
            .collect();
        Value::text_map([
            ("version", Value::Integer(SYNC_DATA_VERSION)),
            ("storage_pair_map", Value::Map(pairs)),
        ])
    }

    /// Reads version 2 records and version 1 records (`sync_pair_dict`).
    /// Version 1 records are written back as version 2.
    fn from_state(state: Value) -> StorageResult<Self> {
        if state.as_map().is_none() {
            return Err(StorageError::corrupted(format!(
                "sync record is a {}",
                state.type_name()
            )));
        }
        let storage_pair_map = match state
            .get("storage_pair_map")
            .or_else(|| state.get("sync_pair_dict"))
        {
            Some(map) => pairs_from(map)?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            version: SYNC_DATA_VERSION,
            storage_pair_map,
        })
    }
}
