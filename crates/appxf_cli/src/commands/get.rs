//! Get command implementation.

use super::location::{self, LocationOptions};
use appxf_codec::Value;
use appxf_storage::StorageRegistry;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Writes the content of `item` in `dir` to `output`, or stdout.
pub fn run(
    dir: &Path,
    item: &str,
    output: Option<&Path>,
    options: &LocationOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = load(dir, item, options)?;
    match output {
        Some(path) => fs::write(path, data)?,
        None => std::io::stdout().lock().write_all(&data)?,
    }
    Ok(())
}

fn load(
    dir: &Path,
    item: &str,
    options: &LocationOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let factory = location::open(&StorageRegistry::new(), dir, options)?;
    let storage = factory.get(item)?;
    if !storage.exists()? {
        return Err(format!("{} does not exist", storage.id()).into());
    }
    match storage.load()? {
        Value::Bytes(data) => Ok(data),
        Value::Null => Ok(Vec::new()),
        other => Err(format!("unexpected {} content", other.type_name()).into()),
    }
}
