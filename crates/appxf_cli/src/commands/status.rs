//! Status command implementation.

use super::location::{self, LocationOptions};
use super::sync::describe;
use appxf_storage::StorageRegistry;
use appxf_sync::{plan, SyncConfig};
use std::path::Path;

/// Prints what a sync of `a` and `b` would do, without writing.
///
/// Fails if any item would not sync.
pub fn run(
    a: &Path,
    b: &Path,
    items: &[String],
    config: SyncConfig,
    options: &LocationOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = StorageRegistry::new();
    let factory_a = location::open(&registry, a, options)?;
    let factory_b = location::open(&registry, b, options)?;

    let mut blocked = 0usize;
    for name in location::item_names(items, &[a, b])? {
        let storage_a = factory_a.get(&name)?;
        let storage_b = factory_b.get(&name)?;
        match plan(&storage_a, &storage_b, &config) {
            Ok(action) => println!("{name}: {}", describe(action, true)),
            Err(e) => {
                blocked += 1;
                println!("{name}: blocked: {e}");
            }
        }
    }
    if blocked > 0 {
        return Err(format!("{blocked} item(s) cannot be synced").into());
    }
    Ok(())
}
