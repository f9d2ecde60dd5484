//! # APPXF Storage
//!
//! Named items at physical locations, with the metadata needed to
//! synchronize them.
//!
//! A [`Storage`] addresses one item (a name) at one location (a directory,
//! a RAM area, a remote path). It serializes values, writes raw bytes
//! through a [`Backend`] and refreshes a [`MetaData`] record on every
//! store. Backends are **opaque byte stores** and know nothing about any
//! of this.
//!
//! ## Design Principles
//!
//! - One live storage per (kind, location, name), enforced by
//!   [`StorageRegistry`]
//! - Auxiliary records (`meta`, `sync`) live next to the item and are
//!   always human readable
//! - Layers such as [`EncryptionLayer`] transform primary content only
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - RAM areas for testing
//! - [`LocalBackend`] - directories using OS file APIs
//! - [`RetryingBackend`] - reconnect-and-retry wrapper for remote backends
//!
//! ## Example
//!
//! ```rust
//! use appxf_codec::Value;
//! use appxf_storage::{InMemoryBackend, StorageOptions, StorageRegistry};
//! use std::sync::Arc;
//!
//! let registry = StorageRegistry::new();
//! let storage = registry
//!     .create(Arc::new(InMemoryBackend::new("ram")), "greeting", StorageOptions::new())
//!     .unwrap();
//! storage.store(&Value::from("hello world")).unwrap();
//! assert_eq!(storage.load().unwrap(), Value::from("hello world"));
//! assert!(storage.get_meta_data().unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod encrypted;
mod error;
mod factory;
mod local;
mod memory;
mod meta_data;
mod registry;
mod retry;
mod storable;
mod storage;

pub use backend::{Backend, ItemRef};
pub use encrypted::{EncryptionKey, EncryptionLayer, Layer, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use local::{LocalBackend, META_DIR};
pub use memory::InMemoryBackend;
pub use meta_data::{now_timestamp, MetaData, META_DATA_VERSION, TIMESTAMP_FORMAT};
pub use registry::StorageRegistry;
pub use retry::{Reconnect, RetryConfig, RetryingBackend};
pub use storable::Storable;
pub use storage::{Storage, StorageOptions, META_TAG, SYNC_TAG};
