//! Decision procedure and copy execution.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::sync_data::SyncData;
use appxf_storage::{MetaData, Storage, StorageError, StorageFactory};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What a sync of one item does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Both sides are in sync, or there is nothing to copy.
    Nothing,
    /// A replaces B.
    CopyAToB,
    /// B replaces A.
    CopyBToA,
}

impl SyncAction {
    /// Returns true if the action writes.
    #[must_use]
    pub fn is_copy(self) -> bool {
        !matches!(self, SyncAction::Nothing)
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncAction::Nothing => "in sync",
            SyncAction::CopyAToB => "copy A -> B",
            SyncAction::CopyBToA => "copy B -> A",
        })
    }
}

fn meta_data(storage: &Storage) -> SyncResult<MetaData> {
    storage.require_meta_data().map_err(|e| match e {
        StorageError::MissingMetaData { id } => SyncError::MissingMetaData { id },
        other => other.into(),
    })
}

/// Decides how to sync `a` and `b` without writing anything.
///
/// 1. Existence: nothing exists, nothing to do. One side exists, it seeds
///    the other (in one-directional mode only A seeds B).
/// 2. Both exist: each side's metadata uuid is compared with the uuid its
///    sync record holds for the other side. A side whose uuid differs has
///    changed since the last sync between exactly these two locations.
///
/// In one-directional mode B's state is never consulted beyond existence.
///
/// # Errors
///
/// - [`SyncError::NameMismatch`] if the handles address different items
/// - [`SyncError::MissingMetaData`] if an existing side has no metadata
/// - [`SyncError::MissingSyncRecord`] if both exist but a record is missing
/// - [`SyncError::ChangeOnBothSides`] if both changed independently
pub fn plan(a: &Storage, b: &Storage, config: &SyncConfig) -> SyncResult<SyncAction> {
    if a.name() != b.name() {
        return Err(SyncError::NameMismatch {
            a: a.name().to_string(),
            b: b.name().to_string(),
        });
    }

    match (a.exists()?, b.exists()?) {
        (false, false) => {
            debug!(a = %a.id(), b = %b.id(), "item exists on neither side");
            return Ok(SyncAction::Nothing);
        }
        (false, true) if config.only_a_to_b => return Ok(SyncAction::Nothing),
        (false, true) => {
            debug!(a = %a.id(), b = %b.id(), "item missing on A");
            return Ok(SyncAction::CopyBToA);
        }
        (true, false) => {
            debug!(a = %a.id(), b = %b.id(), "item missing on B");
            return Ok(SyncAction::CopyAToB);
        }
        (true, true) => {}
    }

    let meta_a = meta_data(a)?;
    let sync_data_a = SyncData::load_for(a)?;
    let last_uuid_a = sync_data_a.location_uuid(a, b);
    let changed_a = meta_a.uuid[..] != *last_uuid_a;

    if config.only_a_to_b {
        return Ok(if changed_a {
            SyncAction::CopyAToB
        } else {
            SyncAction::Nothing
        });
    }

    let meta_b = meta_data(b)?;
    let sync_data_b = SyncData::load_for(b)?;
    let last_uuid_b = sync_data_b.location_uuid(b, a);
    let changed_b = meta_b.uuid[..] != *last_uuid_b;

    if last_uuid_a.is_empty() || last_uuid_b.is_empty() {
        return Err(SyncError::MissingSyncRecord {
            a: a.id(),
            b: b.id(),
        });
    }
    match (changed_a, changed_b) {
        (true, true) => Err(SyncError::ChangeOnBothSides {
            a: a.id(),
            b: b.id(),
        }),
        (true, false) => Ok(SyncAction::CopyAToB),
        (false, true) => Ok(SyncAction::CopyBToA),
        (false, false) => {
            debug!(a = %a.id(), b = %b.id(), "item unchanged");
            Ok(SyncAction::Nothing)
        }
    }
}

/// Replaces `target` with `source` and records the agreement on both sides.
///
/// After the copy both items carry the source's metadata uuid, and both
/// sync records hold that uuid for each other. There is no rollback: if a
/// record write fails after the content write, the next sync will likely
/// report a conflict.
///
/// Everything needed from `source` is read before `target` is written, so
/// a source without metadata leaves `target` untouched.
///
/// # Errors
///
/// Returns an error if a read or write fails, or if a side has no metadata.
pub fn execute_sync(source: &Storage, target: &Storage) -> SyncResult<()> {
    info!(source = %source.id(), target = %target.id(), "updating");

    let data = source.load()?;
    let source_meta = meta_data(source)?;
    let mut source_sync = SyncData::load_for(source)?;
    target.store(&data)?;

    let mut target_meta = meta_data(target)?;
    target_meta.uuid = source_meta.uuid;
    target.set_meta_data(&target_meta)?;

    let mut target_sync = SyncData::load_for(target)?;
    source_sync.set_location_uuid(source, target, &source_meta.uuid);
    source_sync.store_for(source)?;
    target_sync.set_location_uuid(target, source, &source_meta.uuid);
    target_sync.store_for(target)?;
    Ok(())
}

/// Plans and, unless `config.dry_run`, executes the sync of one item.
///
/// # Errors
///
/// See [`plan`] and [`execute_sync`].
pub fn sync_storage(a: &Storage, b: &Storage, config: &SyncConfig) -> SyncResult<SyncAction> {
    debug!(a = %a.id(), b = %b.id(), "syncing");
    let action = plan(a, b, config)?;
    if config.dry_run {
        return Ok(action);
    }
    match action {
        SyncAction::Nothing => {}
        SyncAction::CopyAToB => execute_sync(a, b)?,
        SyncAction::CopyBToA => execute_sync(b, a)?,
    }
    Ok(action)
}

/// Outcome of one item within a multi-item sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Item name.
    pub name: String,
    /// What was (or, in a dry run, would be) done.
    pub action: SyncAction,
}

/// Outcome of [`sync_factories`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Per-item outcomes in processing order.
    pub items: Vec<ItemOutcome>,
}

impl SyncReport {
    /// Adds an outcome.
    pub fn record(&mut self, name: impl Into<String>, action: SyncAction) {
        self.items.push(ItemOutcome {
            name: name.into(),
            action,
        });
    }

    /// Number of items copied from A to B.
    #[must_use]
    pub fn copied_a_to_b(&self) -> usize {
        self.count(SyncAction::CopyAToB)
    }

    /// Number of items copied from B to A.
    #[must_use]
    pub fn copied_b_to_a(&self) -> usize {
        self.count(SyncAction::CopyBToA)
    }

    /// Number of items left as they were.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(SyncAction::Nothing)
    }

    fn count(&self, action: SyncAction) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }
}

/// Syncs every item registered at factory `a` with the same item at `b`.
///
/// Items known only to `b` are not discovered; obtain them through `a`
/// first (e.g. `a.get(name)`) to include them. The first error aborts the
/// run and is returned.
///
/// # Errors
///
/// See [`sync_storage`].
pub fn sync_factories(
    a: &StorageFactory,
    b: &StorageFactory,
    config: &SyncConfig,
) -> SyncResult<SyncReport> {
    info!(
        a = %format!("{}({})", a.kind(), a.location()),
        b = %format!("{}({})", b.kind(), b.location()),
        "syncing factories"
    );
    let mut report = SyncReport::default();
    let items: Vec<Arc<Storage>> = a.all_registered();
    for storage in items {
        let partner = b.get(storage.name())?;
        let action = sync_storage(&storage, &partner, config)?;
        report.record(storage.name(), action);
    }
    Ok(report)
}
