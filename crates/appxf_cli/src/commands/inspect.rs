//! Inspect command implementation.

use super::location::{self, LocationOptions};
use appxf_storage::{MetaData, StorageRegistry};
use appxf_sync::SyncData;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Inspection result for one item.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Storage identifier.
    pub id: String,
    /// Whether the primary content exists.
    pub exists: bool,
    /// Metadata record, if any.
    pub meta: Option<MetaReport>,
    /// Sync record entries keyed by partner.
    pub sync: Vec<PairReport>,
}

/// Metadata in display form.
#[derive(Debug, Serialize)]
pub struct MetaReport {
    /// Record version.
    pub version: i64,
    /// Change uuid.
    pub uuid: String,
    /// Content hash, base64. Empty if not computed.
    pub hash: String,
    /// Time of the last store.
    pub timestamp: Option<String>,
}

impl From<&MetaData> for MetaReport {
    fn from(meta: &MetaData) -> Self {
        Self {
            version: meta.version,
            uuid: Uuid::from_bytes(meta.uuid).to_string(),
            hash: STANDARD.encode(&meta.hash),
            timestamp: meta.timestamp.clone(),
        }
    }
}

/// One sync partner.
#[derive(Debug, Serialize)]
pub struct PairReport {
    /// `"<user>--<partner location>"`.
    pub partner: String,
    /// Agreed uuid.
    pub uuid: String,
    /// Time of the last sync.
    pub timestamp: Option<String>,
}

fn format_uuid(bytes: &[u8]) -> String {
    Uuid::from_slice(bytes).map_or_else(|_| STANDARD.encode(bytes), |uuid| uuid.to_string())
}

/// Collects metadata and sync record of `item` in `dir`.
pub fn inspect(
    dir: &Path,
    item: &str,
    options: &LocationOptions,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let factory = location::open(&StorageRegistry::new(), dir, options)?;
    let storage = factory.get(item)?;
    let meta = storage.get_meta_data()?;
    let sync = SyncData::load_for(&storage)?
        .storage_pair_map
        .into_iter()
        .map(|(partner, pair)| PairReport {
            partner,
            uuid: format_uuid(&pair.uuid),
            timestamp: pair.timestamp,
        })
        .collect();
    Ok(InspectResult {
        id: storage.id(),
        exists: storage.exists()?,
        meta: meta.as_ref().map(MetaReport::from),
        sync,
    })
}

/// Prints the inspection result as JSON.
pub fn run(
    dir: &Path,
    item: &str,
    options: &LocationOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(dir, item, options)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
