// SPDX-License-Identifier: MIT
//! Guards against externally supplied identifiers reaching the filesystem.
//!
//! User ids, provider names, and account ids all arrive from outside the
//! process and some of them become file names. Validation is allow-list
//! based: anything not matching the identifier grammar is rejected before
//! a path is ever built from it.

use crate::error::{Result, StoreError};

/// Longest accepted identifier. Keeps derived file names well under
/// platform name limits.
const MAX_IDENTIFIER_LEN: usize = 128;

/// Validate an externally supplied identifier.
///
/// Accepted: 1–128 chars from `[A-Za-z0-9@._-]`. Rejected outright:
/// anything containing a path separator (not in the allow-list), and the
/// dot-only names `.` / `..`, which would name the current or parent
/// directory.
pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN {
        return Err(StoreError::InvalidIdentifier(id.to_string()));
    }
    if id.chars().all(|c| c == '.') {
        return Err(StoreError::InvalidIdentifier(id.to_string()));
    }
    for c in id.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-')) {
            return Err(StoreError::InvalidIdentifier(id.to_string()));
        }
    }
    Ok(())
}
