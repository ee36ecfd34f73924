//! Configuration root resolution for the persistence stores.
//!
//! Every path the stores touch hangs off one configurable home directory.
//! Priority (highest to lowest): explicit constructor argument, `HIVE_HOME`
//! env var, platform default data dir. The backup directory resolves the
//! same way via `HIVE_BACKUP_DIR`, defaulting to `<home>/backups`.

use std::path::{Path, PathBuf};

/// Env var overriding the configuration home.
pub const HOME_ENV: &str = "HIVE_HOME";
/// Env var overriding where snapshot artifacts are written.
pub const BACKUP_DIR_ENV: &str = "HIVE_BACKUP_DIR";

const AUTH_FILE: &str = "auth.json";
const USER_STATES_DIR: &str = "user_states";
const LIVE_STATE_FILE: &str = "hive_state.json";
const BACKUPS_DIR: &str = "backups";

/// Resolved store locations. Build once at startup, share via `Arc`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    home: PathBuf,
    backup_dir: PathBuf,
}

impl StoreConfig {
    /// Build config from optional explicit overrides.
    ///
    /// Priority (highest to lowest):
    ///   1. explicit argument
    ///   2. `HIVE_HOME` / `HIVE_BACKUP_DIR` env vars
    ///   3. platform default (`~/Library/Application Support/hive`,
    ///      `$XDG_DATA_HOME/hive`, `%APPDATA%\hive`, …)
    pub fn new(home: Option<PathBuf>, backup_dir: Option<PathBuf>) -> Self {
        let home = home
            .or_else(|| env_path(HOME_ENV))
            .unwrap_or_else(default_home);
        let backup_dir = backup_dir
            .or_else(|| env_path(BACKUP_DIR_ENV))
            .unwrap_or_else(|| home.join(BACKUPS_DIR));
        Self { home, backup_dir }
    }

    /// Root everything at an explicit directory, ignoring env vars.
    pub fn rooted_at(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let backup_dir = home.join(BACKUPS_DIR);
        Self { home, backup_dir }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The shared keyring collection file.
    pub fn auth_path(&self) -> PathBuf {
        self.home.join(AUTH_FILE)
    }

    /// Directory holding one `<userId>.json` per user.
    pub fn user_states_dir(&self) -> PathBuf {
        self.home.join(USER_STATES_DIR)
    }

    /// The live configuration state: the source of snapshot exports and
    /// the target of imports.
    pub fn live_state_path(&self) -> PathBuf {
        self.home.join(LIVE_STATE_FILE)
    }

    /// Where snapshot artifacts land.
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn default_home() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/hive
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("hive");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/hive or ~/.local/share/hive
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("hive");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("share").join("hive");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\hive
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("hive");
        }
    }
    // Fallback
    PathBuf::from(".hive")
}
