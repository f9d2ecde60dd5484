//! Sync command implementation.

use super::location::{self, LocationOptions};
use appxf_storage::StorageRegistry;
use appxf_sync::{sync_storage, SyncAction, SyncConfig, SyncReport};
use std::path::Path;
use tracing::{error, info};

/// Syncs items between directories `a` and `b`.
///
/// Without `keep_going` the first failing item aborts the run. With it,
/// failures are logged and skipped, and the run still fails at the end.
pub fn run(
    a: &Path,
    b: &Path,
    items: &[String],
    config: SyncConfig,
    keep_going: bool,
    options: &LocationOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = StorageRegistry::new();
    let factory_a = location::open(&registry, a, options)?;
    let factory_b = location::open(&registry, b, options)?;
    let names = location::item_names(items, &[a, b])?;

    let mut report = SyncReport::default();
    let mut failed = 0usize;
    for name in &names {
        let storage_a = factory_a.get(name)?;
        let storage_b = factory_b.get(name)?;
        match sync_storage(&storage_a, &storage_b, &config) {
            Ok(action) => {
                println!("{name}: {}", describe(action, config.dry_run));
                report.record(name.as_str(), action);
            }
            Err(e) if keep_going => {
                error!(item = %name, "{e}");
                failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        a_to_b = report.copied_a_to_b(),
        b_to_a = report.copied_b_to_a(),
        unchanged = report.unchanged(),
        failed,
        "sync finished"
    );
    println!(
        "{} copied A -> B, {} copied B -> A, {} in sync, {} failed",
        report.copied_a_to_b(),
        report.copied_b_to_a(),
        report.unchanged(),
        failed
    );
    if failed > 0 {
        return Err(format!("{failed} item(s) failed to sync").into());
    }
    Ok(())
}

/// Human readable action, prefixed in dry runs.
pub fn describe(action: SyncAction, dry_run: bool) -> String {
    if dry_run && action.is_copy() {
        format!("would {action}")
    } else {
        action.to_string()
    }
}
