//! JSON document helpers shared by the cache and the document store.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Atomically write `value` as pretty JSON with a trailing newline.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
///
/// Readers see either the previous file or the new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = tmp_sibling(path);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
