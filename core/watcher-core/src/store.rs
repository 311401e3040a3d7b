//! Atomic file store.
//!
//! Every persisted artifact (state flags, backups, the target widget document)
//! is written through this module: content goes to a sibling temp file which is
//! flushed, synced, and then renamed over the destination. A reader sees either
//! the old file or the new one, never a torn write.
//!
//! If any step fails the `NamedTempFile` is dropped, which deletes it, so a
//! failed save never leaves a stray temp file behind.

use std::io::Write;
use std::path::Path;

use fs_err as fs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, WatcherError};

/// Reads and parses a JSON document.
///
/// Fails with [`WatcherError::NotFound`] when the file is absent and
/// [`WatcherError::Parse`] when it is malformed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text(path)?;
    serde_json::from_str(&content).map_err(|source| WatcherError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a whole file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| WatcherError::from_io(path, format!("reading {}", path.display()), e))
}

/// Serializes `document` as 4-space indented JSON and writes it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, document: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|source| WatcherError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    write_atomic(path, &buf)
}

/// Writes plain text atomically.
pub fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, text.as_bytes())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        WatcherError::from_io(dir, format!("creating temp file in {}", dir.display()), e)
    })?;

    tmp.write_all(contents).map_err(|e| {
        WatcherError::from_io(path, format!("writing temp file for {}", path.display()), e)
    })?;

    tmp.flush().map_err(|e| {
        WatcherError::from_io(path, format!("flushing temp file for {}", path.display()), e)
    })?;

    tmp.as_file().sync_all().map_err(|e| {
        WatcherError::from_io(path, format!("syncing temp file for {}", path.display()), e)
    })?;

    tmp.persist(path).map_err(|e| {
        WatcherError::from_io(
            path,
            format!("persisting temp file to {}", path.display()),
            e.error,
        )
    })?;

    Ok(())
}

/// Deletes `path` if it exists. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(WatcherError::from_io(
            path,
            format!("removing {}", path.display()),
            e,
        )),
    }
}
