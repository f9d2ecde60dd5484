//! Local file system backend.

use crate::backend::{Backend, ItemRef};
use crate::error::{StorageError, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory holding auxiliary siblings below the location root.
pub const META_DIR: &str = ".meta";

/// A directory on the local file system.
///
/// Layout:
///
/// ```text
/// <root>/<name>                 primary item
/// <root>/.meta/<name>.<tag>     auxiliary sibling (meta, sync, ...)
/// ```
///
/// # Example
///
/// ```no_run
/// use appxf_storage::{Backend, ItemRef, LocalBackend};
///
/// let backend = LocalBackend::open("./data").unwrap();
/// backend.store_raw(ItemRef::primary("settings"), b"...").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    location: String,
}

impl LocalBackend {
    /// Kind reported by this backend.
    pub const KIND: &'static str = "LocalStorage";

    /// Opens a directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let location = root.to_string_lossy().into_owned();
        Ok(Self { root, location })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all primary items present on disk, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn item_names(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// File path for an item.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] for names that would escape
    /// the root directory.
    pub fn path_for(&self, item: ItemRef<'_>) -> StorageResult<PathBuf> {
        validate_name(item.name)?;
        Ok(match item.meta {
            Some(tag) => {
                validate_name(tag)?;
                self.root.join(META_DIR).join(format!("{}.{}", item.name, tag))
            }
            None => self.root.join(item.name),
        })
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidArgument(format!(
            "'{name}' is not a valid item name"
        )));
    }
    Ok(())
}

impl Backend for LocalBackend {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn exists(&self, item: ItemRef<'_>) -> StorageResult<bool> {
        Ok(self.path_for(item)?.try_exists()?)
    }

    fn store_raw(&self, item: ItemRef<'_>, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(item)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    fn load_raw(&self, item: ItemRef<'_>) -> StorageResult<Vec<u8>> {
        match fs::read(self.path_for(item)?) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, item: ItemRef<'_>) -> StorageResult<()> {
        match fs::remove_file(self.path_for(item)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
