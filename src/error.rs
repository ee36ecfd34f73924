//! Error taxonomy for the persistence stores.
//!
//! Missing data is never an error here: lookups return `Ok(None)` and
//! callers branch on it. Everything in `StoreError` is a real fault the
//! caller (the host's request layer) must translate.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed: permission, disk-full, device, or a stuck
    /// disk (surfaces with `ErrorKind::TimedOut`).
    #[error("filesystem failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// On-disk content exists but does not parse or fails shape validation.
    /// Distinct from `Io` so operators can tell "broken data" from "no data".
    #[error("corrupt store file at {}: {detail}", path.display())]
    Corrupt { path: PathBuf, detail: String },

    /// A snapshot artifact declares a format version this build cannot
    /// interpret.
    #[error("unsupported snapshot format version {found} (supported: {supported})")]
    UnsupportedSnapshotVersion { found: String, supported: String },

    /// An externally supplied identifier failed sanitization.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
