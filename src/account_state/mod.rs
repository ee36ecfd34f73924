//! Per-user opaque state persistence.
//!
//! One `user_states/<userId>.json` per user. Payloads are schema-free
//! `serde_json::Value` trees owned by application code; this store only
//! persists and returns them, always full-replace, never merged.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::security::validate_identifier;
use crate::storage;

/// Store for one opaque state blob per user id.
///
/// Writers hold a read slot on the shared state gate plus a per-user mutex:
/// distinct users write in parallel, same-user writers serialize, and the
/// snapshot service (which takes the gate's write slot) excludes them all
/// while exporting or importing.
#[derive(Clone)]
pub struct AccountStateStore {
    config: Arc<StoreConfig>,
    gate: Arc<RwLock<()>>,
    user_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AccountStateStore {
    pub fn new(config: Arc<StoreConfig>, gate: Arc<RwLock<()>>) -> Self {
        Self {
            config,
            gate,
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Persist `payload` for `user_id`, fully replacing any prior state.
    pub async fn save_state(&self, user_id: &str, payload: &Value) -> Result<()> {
        let path = self.state_path(user_id)?;
        let user_lock = self.lock_for(user_id).await;

        let _gate = self.gate.read().await;
        let _user = user_lock.lock().await;
        storage::write_json(&path, payload).await?;
        info!(user_id, "user state saved");
        Ok(())
    }

    /// Load the last-saved state for `user_id`.
    ///
    /// `Ok(None)` means the user has never saved (the "new user" case),
    /// so callers need no separate existence check.
    pub async fn load_state(&self, user_id: &str) -> Result<Option<Value>> {
        let path = self.state_path(user_id)?;
        let state = storage::read_json(&path).await?;
        debug!(user_id, found = state.is_some(), "user state loaded");
        Ok(state)
    }

    /// Derive the user's state file path. The id is validated first so an
    /// externally supplied value can never escape `user_states/`.
    fn state_path(&self, user_id: &str) -> Result<PathBuf> {
        validate_identifier(user_id)?;
        Ok(self.config.user_states_dir().join(format!("{user_id}.json")))
    }

    async fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
