//! Put command implementation.

use super::location::{self, LocationOptions};
use appxf_codec::Value;
use appxf_storage::StorageRegistry;
use std::fs;
use std::path::Path;
use tracing::info;

/// Stores the contents of `file` as `item` in `dir`, with fresh metadata.
pub fn run(
    dir: &Path,
    item: &str,
    file: &Path,
    options: &LocationOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(file)?;
    let factory = location::open(&StorageRegistry::new(), dir, options)?;
    let storage = factory.get(item)?;
    storage.store(&Value::Bytes(data))?;
    info!(storage = %storage.id(), "stored");
    Ok(())
}
