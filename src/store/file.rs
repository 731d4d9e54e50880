//! Atomic file operations for the local store.
//!
//! - Atomic writes: write to temp file, sync to disk, then rename
//! - JSON documents are pretty-printed so snapshots diff cleanly

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::StoreError;

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to the target
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), StoreError> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    {
        let file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|()| writer.flush())
            .and_then(|()| writer.get_ref().sync_all())
            .map_err(|e| StoreError::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))?;

    Ok(())
}

/// Serialize a value as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_document<T: Serialize>(path: &Path, value: &T) -> Result<String, StoreError> {
    let mut doc = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
    doc.push('\n');
    Ok(doc)
}

/// Read and deserialize one JSON document.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

/// Make a store key safe to use as a file stem.
#[must_use]
pub fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}
