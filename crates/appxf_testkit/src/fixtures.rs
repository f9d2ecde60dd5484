//! Two-location test environments.
//!
//! Sync tests need one registry with two locations. [`TestEnv`] bundles
//! them as factories `a` and `b`, backed by RAM areas or by temporary
//! directories that are removed when the environment is dropped.

use appxf_storage::{
    Backend, EncryptionKey, EncryptionLayer, InMemoryBackend, LocalBackend, StorageFactory,
    StorageOptions, StorageRegistry,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Registry plus two locations.
pub struct TestEnv {
    /// Shared registry.
    pub registry: StorageRegistry,
    /// Factory for location A.
    pub a: StorageFactory,
    /// Factory for location B.
    pub b: StorageFactory,
    /// Temporary root when file based (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestEnv {
    /// Two RAM areas, `"location_a"` and `"location_b"`.
    pub fn memory() -> Self {
        Self::memory_with(StorageOptions::new())
    }

    /// Two RAM areas with the given options for both factories.
    pub fn memory_with(options: StorageOptions) -> Self {
        let registry = StorageRegistry::new();
        let a = registry.factory(
            Arc::new(InMemoryBackend::new("location_a")),
            options.clone(),
        );
        let b = registry.factory(Arc::new(InMemoryBackend::new("location_b")), options);
        Self {
            registry,
            a,
            b,
            _temp_dir: None,
        }
    }

    /// Two directories `a/` and `b/` below a fresh temporary root.
    pub fn local() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let registry = StorageRegistry::new();
        let a = registry.factory(local_backend(&temp_dir.path().join("a")), StorageOptions::new());
        let b = registry.factory(local_backend(&temp_dir.path().join("b")), StorageOptions::new());
        Self {
            registry,
            a,
            b,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Like [`TestEnv::memory`], with both factories behind encryption
    /// layers sharing one key.
    pub fn encrypted() -> Self {
        let plain = Self::memory();
        let key = EncryptionKey::generate();
        let layer_a = Arc::new(EncryptionLayer::new(key.clone()));
        let layer_b = Arc::new(EncryptionLayer::new(key));
        let a = plain
            .registry
            .layered_factory(&plain.a, layer_a, StorageOptions::new())
            .expect("Failed to layer factory A");
        let b = plain
            .registry
            .layered_factory(&plain.b, layer_b, StorageOptions::new())
            .expect("Failed to layer factory B");
        Self { a, b, ..plain }
    }

    /// Root directory when file based.
    pub fn root(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }
}

fn local_backend(path: &Path) -> Arc<dyn Backend> {
    Arc::new(LocalBackend::open(path).expect("Failed to open local backend"))
}
