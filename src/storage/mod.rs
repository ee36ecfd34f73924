// SPDX-License-Identifier: MIT
//! Atomic JSON file store.
//!
//! The one primitive everything above is built on: read a JSON file into a
//! typed value, write a typed value back with all-or-nothing semantics.
//! Writes go to a `.tmp` sibling first and are renamed over the
//! destination, so a concurrent reader sees either the old file or the new
//! one, never a partial write. Every filesystem call carries a bounded
//! timeout so a stuck disk reports an error instead of hanging a request.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::error::{Result, StoreError};

/// Upper bound for any single filesystem call.
const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a filesystem future with the standard timeout.
async fn io_call<T>(fut: impl Future<Output = io::Result<T>>) -> io::Result<T> {
    match tokio::time::timeout(IO_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("filesystem operation timed out after {}s", IO_TIMEOUT.as_secs()),
        )),
    }
}

/// Create `dir` and any missing parents. Idempotent.
pub async fn ensure_container(dir: &Path) -> Result<()> {
    io_call(fs::create_dir_all(dir))
        .await
        .map_err(|e| StoreError::io(dir, e))
}

/// Read and parse a JSON file.
///
/// A missing file is `Ok(None)`: "no prior state" is a normal first-use
/// case, not an error. Content that exists but fails to parse is
/// [`StoreError::Corrupt`].
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match io_call(fs::read(path)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::corrupt(path, e.to_string()))
}

/// Serialize `value` and write it to `path` atomically.
///
/// The parent directory is created if absent. The bytes land in a `.tmp`
/// sibling first; the atomic rename makes the new content visible in one
/// step. On rename failure the temp file is cleaned up best-effort.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(value).map_err(|e| StoreError::corrupt(path, e.to_string()))?;

    if let Some(parent) = path.parent() {
        ensure_container(parent).await?;
    }

    let tmp = tmp_path(path);
    io_call(fs::write(&tmp, &json))
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    if let Err(e) = io_call(fs::rename(&tmp, path)).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".tmp");
    path.with_file_name(name)
}
