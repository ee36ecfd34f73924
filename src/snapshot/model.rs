use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version written into every exported artifact.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0.0";

/// A portable, versioned export of the configuration state.
///
/// Self-describing: `format_version` is checked before an artifact is ever
/// applied, and `exported_at` records when the copy was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub format_version: String,
    pub exported_at: DateTime<Utc>,
    pub data: SnapshotData,
}

/// Everything a snapshot carries: the live state plus every user state.
/// Keyring credentials never appear in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    /// Contents of `hive_state.json`; JSON `null` when no live state
    /// existed at export time.
    #[serde(default)]
    pub state: Value,
    /// Per-user payloads keyed by user id. A `BTreeMap` keeps the export
    /// byte-for-byte deterministic for identical inputs.
    #[serde(default)]
    pub user_states: BTreeMap<String, Value>,
}
