//! Multi-account credential keyring.
//!
//! One shared `auth.json` holds every stored profile, keyed by
//! `(provider, accountId)`. Mutations are read-modify-write over the whole
//! collection, so they all funnel through a single write lock; lookups read
//! the file directly and rely on atomic-rename write semantics for a
//! consistent view.

pub mod model;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::security::validate_identifier;
use crate::storage;

pub use model::{CredentialProfile, KeyringCollection};

#[derive(Clone)]
pub struct Keyring {
    config: Arc<StoreConfig>,
    write_lock: Arc<Mutex<()>>,
}

impl Keyring {
    pub fn new(config: Arc<StoreConfig>) -> Self {
        Self {
            config,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Look up the stored profile for `(provider, accountId)`.
    ///
    /// A missing keyring file and a missing profile both come back as
    /// `Ok(None)`: "never configured" and "not configured" are the same
    /// answer at this layer. A keyring file that exists but will not parse
    /// is [`crate::StoreError::Corrupt`].
    pub async fn get_credentials(
        &self,
        provider: &str,
        account_id: &str,
    ) -> Result<Option<CredentialProfile>> {
        validate_identifier(provider)?;
        validate_identifier(account_id)?;
        let collection = self.load().await?;
        Ok(collection.find(provider, account_id).cloned())
    }

    /// Upsert a profile and write the collection back atomically.
    ///
    /// Held under the keyring write lock for the whole read-modify-write
    /// sequence, so concurrent saves cannot lose each other's updates.
    pub async fn save_credentials(&self, profile: CredentialProfile) -> Result<()> {
        validate_identifier(&profile.provider)?;
        validate_identifier(&profile.account_id)?;

        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;
        collection.upsert(profile.clone());
        storage::write_json(&self.path(), &collection).await?;
        info!(
            provider = %profile.provider,
            account_id = %profile.account_id,
            "credentials saved"
        );
        Ok(())
    }

    /// Remove the profile for `(provider, accountId)`. Returns whether a
    /// profile was present.
    pub async fn remove_credentials(&self, provider: &str, account_id: &str) -> Result<bool> {
        validate_identifier(provider)?;
        validate_identifier(account_id)?;

        let _guard = self.write_lock.lock().await;
        let mut collection = self.load().await?;
        let removed = collection.remove(provider, account_id);
        if removed {
            storage::write_json(&self.path(), &collection).await?;
            info!(provider, account_id, "credentials removed");
        }
        Ok(removed)
    }

    /// Every stored profile, in insertion order.
    pub async fn list_credentials(&self) -> Result<Vec<CredentialProfile>> {
        Ok(self.load().await?.profiles)
    }

    async fn load(&self) -> Result<KeyringCollection> {
        // Missing file = empty keyring; corrupt file propagates as-is.
        Ok(storage::read_json(&self.path()).await?.unwrap_or_default())
    }

    fn path(&self) -> PathBuf {
        self.config.auth_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use futures_util::future::join_all;
    use serde_json::json;
    use tempfile::TempDir;

    fn keyring(dir: &TempDir) -> Keyring {
        Keyring::new(Arc::new(StoreConfig::rooted_at(dir.path())))
    }

    fn profile(provider: &str, account_id: &str, secret: &str) -> CredentialProfile {
        CredentialProfile {
            provider: provider.to_string(),
            account_id: account_id.to_string(),
            secret: json!(secret),
        }
    }

    #[tokio::test]
    async fn empty_keyring_returns_none() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);
        assert!(kr.get_credentials("github", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_get_returns_the_profile() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        kr.save_credentials(profile("github", "u1", "abc")).await.unwrap();
        let got = kr.get_credentials("github", "u1").await.unwrap().unwrap();
        assert_eq!(got.secret, json!("abc"));
    }

    #[tokio::test]
    async fn upsert_replaces_in_place_without_duplicating() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        kr.save_credentials(profile("github", "u1", "abc")).await.unwrap();
        kr.save_credentials(profile("gitlab", "u2", "def")).await.unwrap();
        kr.save_credentials(profile("github", "u1", "xyz")).await.unwrap();

        let all = kr.list_credentials().await.unwrap();
        assert_eq!(all.len(), 2);
        // Replaced in place: github/u1 keeps its original position
        assert_eq!(all[0].provider, "github");
        assert_eq!(all[0].secret, json!("xyz"));
        assert_eq!(all[1].provider, "gitlab");

        let got = kr.get_credentials("github", "u1").await.unwrap().unwrap();
        assert_eq!(got.secret, json!("xyz"));
    }

    #[tokio::test]
    async fn distinct_pairs_do_not_cross_contaminate() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        kr.save_credentials(profile("github", "u1", "s1")).await.unwrap();
        kr.save_credentials(profile("github", "u2", "s2")).await.unwrap();
        kr.save_credentials(profile("openai", "u1", "s3")).await.unwrap();

        assert_eq!(
            kr.get_credentials("github", "u1").await.unwrap().unwrap().secret,
            json!("s1")
        );
        assert_eq!(
            kr.get_credentials("github", "u2").await.unwrap().unwrap().secret,
            json!("s2")
        );
        assert_eq!(
            kr.get_credentials("openai", "u1").await.unwrap().unwrap().secret,
            json!("s3")
        );
        assert!(kr.get_credentials("openai", "u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn structured_secrets_round_trip_verbatim() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        let secret = json!({
            "access_token": "at-123",
            "refresh_token": "rt-456",
            "expires_at": 1735689600
        });
        kr.save_credentials(CredentialProfile {
            provider: "github".to_string(),
            account_id: "u1".to_string(),
            secret: secret.clone(),
        })
        .await
        .unwrap();

        let got = kr.get_credentials("github", "u1").await.unwrap().unwrap();
        assert_eq!(got.secret, secret);
    }

    #[tokio::test]
    async fn corrupt_keyring_file_surfaces_corrupt_error() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);
        std::fs::write(dir.path().join("auth.json"), b"{ profiles: oops").unwrap();

        let err = kr.get_credentials("github", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");

        // Saving must not silently clobber a corrupt store either
        let err = kr.save_credentials(profile("github", "u1", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn invalid_identifiers_are_rejected() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        let err = kr.save_credentials(profile("bad/provider", "u1", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
        let err = kr.get_credentials("github", "../u1").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn remove_credentials_deletes_exactly_one_pair() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        kr.save_credentials(profile("github", "u1", "s1")).await.unwrap();
        kr.save_credentials(profile("github", "u2", "s2")).await.unwrap();

        assert!(kr.remove_credentials("github", "u1").await.unwrap());
        assert!(!kr.remove_credentials("github", "u1").await.unwrap());
        assert!(kr.get_credentials("github", "u1").await.unwrap().is_none());
        assert!(kr.get_credentials("github", "u2").await.unwrap().is_some());
    }

    // Regression for the lost-update race: concurrent read-modify-write
    // sequences must serialize, or profiles silently vanish.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_lose_no_profiles() {
        let dir = TempDir::new().unwrap();
        let kr = keyring(&dir);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let kr = kr.clone();
                tokio::spawn(async move {
                    kr.save_credentials(profile("github", &format!("user-{i}"), "tok"))
                        .await
                })
            })
            .collect();
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let all = kr.list_credentials().await.unwrap();
        assert_eq!(all.len(), 16, "every concurrent save must survive");
    }
}
