//! # APPXF Sync
//!
//! Two-location synchronization of storage items.
//!
//! Every stored item carries a metadata record (`<item>.meta`) with a
//! uuid that changes on each store. After a successful sync both sides
//! carry the same uuid and each side's sync record (`<item>.sync`)
//! remembers it for the partner location. A later sync compares:
//!
//! - the item's current uuid with the one agreed with the partner
//! - on both sides
//!
//! and copies whichever side changed. If both changed, the item is left
//! untouched and [`SyncError::ChangeOnBothSides`] is returned.
//!
//! ## Example
//!
//! ```
//! use appxf_codec::Value;
//! use appxf_storage::{InMemoryBackend, StorageOptions, StorageRegistry};
//! use appxf_sync::{sync_storage, SyncAction, SyncConfig};
//! use std::sync::Arc;
//!
//! let registry = StorageRegistry::new();
//! let a = registry
//!     .create(Arc::new(InMemoryBackend::new("local")), "notes", StorageOptions::new())
//!     .unwrap();
//! let b = registry
//!     .create(Arc::new(InMemoryBackend::new("shared")), "notes", StorageOptions::new())
//!     .unwrap();
//!
//! a.store(&Value::from("hello")).unwrap();
//! let config = SyncConfig::new();
//! assert_eq!(sync_storage(&a, &b, &config).unwrap(), SyncAction::CopyAToB);
//! assert_eq!(sync_storage(&a, &b, &config).unwrap(), SyncAction::Nothing);
//! assert_eq!(b.load().unwrap(), Value::from("hello"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod sync;
mod sync_data;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use sync::{
    execute_sync, plan, sync_factories, sync_storage, ItemOutcome, SyncAction, SyncReport,
};
pub use sync_data::{SyncData, SyncPair, SYNC_DATA_VERSION};
