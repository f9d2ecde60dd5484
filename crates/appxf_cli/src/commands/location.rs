//! Opening directories as storage locations.

use appxf_codec::SerializerKind;
use appxf_storage::{
    EncryptionKey, EncryptionLayer, LocalBackend, StorageFactory, StorageOptions, StorageRegistry,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// How items are opened, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct LocationOptions {
    /// User recorded in sync pair keys.
    pub user: String,
    /// Base64 encoded AES-256 key. Items are encrypted when set.
    pub key: Option<String>,
}

/// Opens `dir` as a factory in `registry`.
///
/// Content is handled as raw bytes so any file can be synced as is.
pub fn open(
    registry: &StorageRegistry,
    dir: &Path,
    options: &LocationOptions,
) -> Result<StorageFactory, Box<dyn std::error::Error>> {
    let storage_options = StorageOptions::new()
        .with_serializer(SerializerKind::Raw)
        .with_user(options.user.clone());
    let backend = Arc::new(LocalBackend::open(dir)?);
    let factory = registry.factory(backend, storage_options.clone());
    match &options.key {
        None => Ok(factory),
        Some(encoded) => {
            let key = EncryptionKey::from_bytes(&STANDARD.decode(encoded.trim())?)?;
            let layer = Arc::new(EncryptionLayer::new(key));
            Ok(registry.layered_factory(&factory, layer, storage_options)?)
        }
    }
}

/// Item names to process: `explicit` if given, else every item present in
/// either directory.
pub fn item_names(
    explicit: &[String],
    dirs: &[&Path],
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }
    let mut names = BTreeSet::new();
    for dir in dirs {
        names.extend(LocalBackend::open(dir)?.item_names()?);
    }
    Ok(names.into_iter().collect())
}
