//! Portable snapshot export/import.
//!
//! A snapshot is one self-contained JSON artifact: the live
//! `hive_state.json` plus every `user_states/*.json`, wrapped with a format
//! version and an export timestamp. Import is destructive (it replaces the
//! whole managed state set), so every validation step runs before anything
//! touches disk.
//!
//! Lock order: the state gate (write slot) is taken before the live-state
//! mutex, always. The keyring lock, were credentials ever folded into
//! snapshots, would be acquired before both.

pub mod model;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use serde_json::Value;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::security::validate_identifier;
use crate::storage;

pub use model::{Snapshot, SnapshotData, SNAPSHOT_FORMAT_VERSION};

#[derive(Clone)]
pub struct SnapshotService {
    config: Arc<StoreConfig>,
    state_gate: Arc<RwLock<()>>,
    live_lock: Arc<Mutex<()>>,
}

impl SnapshotService {
    pub fn new(
        config: Arc<StoreConfig>,
        state_gate: Arc<RwLock<()>>,
        live_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            config,
            state_gate,
            live_lock,
        }
    }

    /// Export the current configuration state to a timestamped artifact in
    /// the backup directory and return the artifact path.
    ///
    /// An empty installation is exportable: absent live state becomes JSON
    /// `null` and an absent `user_states/` directory an empty map. A
    /// corrupt member file fails the export instead of exporting bad data.
    pub async fn export_snapshot(&self) -> Result<PathBuf> {
        let _gate = self.state_gate.write().await;
        let _live = self.live_lock.lock().await;

        let state = storage::read_json::<Value>(&self.config.live_state_path())
            .await?
            .unwrap_or(Value::Null);
        let user_states = self.collect_user_states().await?;

        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION.to_string(),
            exported_at: chrono::Utc::now(),
            data: SnapshotData { state, user_states },
        };

        storage::ensure_container(self.config.backup_dir()).await?;
        let path = self.artifact_path(snapshot.exported_at.timestamp_millis());
        storage::write_json(&path, &snapshot).await?;
        info!(
            path = %path.display(),
            users = snapshot.data.user_states.len(),
            "snapshot exported"
        );
        Ok(path)
    }

    /// Validate and apply a snapshot, fully replacing the live state and
    /// the stored user-state set.
    ///
    /// Nothing is written until the format version and every embedded user
    /// id have passed validation; each individual file write is atomic, so
    /// a mid-import failure never leaves a partially written file behind.
    pub async fn import_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.check_version(&snapshot.format_version)?;
        for user_id in snapshot.data.user_states.keys() {
            validate_identifier(user_id)?;
        }

        let _gate = self.state_gate.write().await;
        let _live = self.live_lock.lock().await;

        let states_dir = self.config.user_states_dir();
        for (user_id, payload) in &snapshot.data.user_states {
            storage::write_json(&states_dir.join(format!("{user_id}.json")), payload).await?;
        }
        storage::write_json(&self.config.live_state_path(), &snapshot.data.state).await?;
        self.remove_stale_states(&snapshot.data.user_states).await?;

        info!(
            users = snapshot.data.user_states.len(),
            version = %snapshot.format_version,
            "snapshot imported"
        );
        Ok(())
    }

    /// Read a `.hive` artifact from disk and import it.
    pub async fn import_snapshot_file(&self, path: &Path) -> Result<()> {
        let snapshot = storage::read_json::<Snapshot>(path)
            .await?
            .ok_or_else(|| {
                StoreError::io(
                    path,
                    io::Error::new(io::ErrorKind::NotFound, "snapshot artifact not found"),
                )
            })?;
        self.import_snapshot(snapshot).await
    }

    /// Accept any artifact sharing the supported major version. A version
    /// string that is not valid semver is unsupported by definition.
    fn check_version(&self, found: &str) -> Result<()> {
        let unsupported = || StoreError::UnsupportedSnapshotVersion {
            found: found.to_string(),
            supported: SNAPSHOT_FORMAT_VERSION.to_string(),
        };
        let found_v = Version::parse(found).map_err(|_| unsupported())?;
        let supported_v = Version::parse(SNAPSHOT_FORMAT_VERSION).map_err(|_| unsupported())?;
        if found_v.major != supported_v.major {
            return Err(unsupported());
        }
        Ok(())
    }

    async fn collect_user_states(&self) -> Result<BTreeMap<String, Value>> {
        let dir = self.config.user_states_dir();
        let mut states = BTreeMap::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(states),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let user_id = match path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            {
                Some(id) => id.to_string(),
                None => continue,
            };
            // Leftover temp files and foreign entries are not state
            if validate_identifier(&user_id).is_err() {
                warn!(file = %path.display(), "skipping foreign file in user_states");
                continue;
            }
            if let Some(payload) = storage::read_json::<Value>(&path).await? {
                states.insert(user_id, payload);
            }
        }
        Ok(states)
    }

    /// Drop user-state files that are not part of the imported set, so the
    /// import is a full replacement rather than a merge.
    async fn remove_stale_states(&self, keep: &BTreeMap<String, Value>) -> Result<()> {
        let dir = self.config.user_states_dir();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let user_id = match path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            {
                Some(id) => id.to_string(),
                None => continue,
            };
            if validate_identifier(&user_id).is_err() || keep.contains_key(&user_id) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => info!(%user_id, "stale user state removed on import"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
        Ok(())
    }

    /// Backup file name, collision-bumped: two exports landing in the same
    /// millisecond get consecutive names instead of clobbering each other.
    fn artifact_path(&self, millis: i64) -> PathBuf {
        let mut millis = millis;
        loop {
            let candidate = self
                .config
                .backup_dir()
                .join(format!("hive_backup_{millis}.hive"));
            if !candidate.exists() {
                return candidate;
            }
            millis += 1;
        }
    }
}
