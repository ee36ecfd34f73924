// SPDX-License-Identifier: MIT
//! Credential & state persistence for the Hive host.
//!
//! Three services over one configurable root:
//! - [`Keyring`]: multi-account credential profiles in a shared `auth.json`
//! - [`AccountStateStore`]: one opaque state blob per user id
//! - [`SnapshotService`]: portable export/import of the configuration state
//!
//! Every store re-reads from disk on each call (no in-process cache) and
//! writes via temp-file + atomic rename, so a reader always observes either
//! the pre- or post-write file, never a partial one. Writers are serialized
//! per logical resource; see the service modules for the lock discipline.

pub mod account_state;
pub mod config;
pub mod error;
pub mod keyring;
pub mod security;
pub mod snapshot;
pub mod storage;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

pub use account_state::AccountStateStore;
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use keyring::{CredentialProfile, Keyring, KeyringCollection};
pub use snapshot::{Snapshot, SnapshotData, SnapshotService, SNAPSHOT_FORMAT_VERSION};

/// Shared persistence state handed to every request handler.
///
/// Construction wires all services to one config root and links the
/// account-state gate to the snapshot service, which needs exclusive
/// access to the state files while exporting or importing.
#[derive(Clone)]
pub struct StoreContext {
    pub config: Arc<StoreConfig>,
    pub keyring: Keyring,
    pub account_state: AccountStateStore,
    pub snapshot: SnapshotService,
}

impl StoreContext {
    pub fn new(config: StoreConfig) -> Self {
        let config = Arc::new(config);
        let state_gate = Arc::new(RwLock::new(()));
        let live_lock = Arc::new(Mutex::new(()));
        Self {
            keyring: Keyring::new(config.clone()),
            account_state: AccountStateStore::new(config.clone(), state_gate.clone()),
            snapshot: SnapshotService::new(config.clone(), state_gate, live_lock),
            config,
        }
    }
}
