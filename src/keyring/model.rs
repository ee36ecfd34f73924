use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored credential, bound to a provider and an account.
///
/// `secret` is opaque: whatever the provider adapter handed over (a bare
/// token string, a structured OAuth grant) is stored and returned
/// verbatim, never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProfile {
    pub provider: String,
    pub account_id: String,
    pub secret: Value,
}

impl CredentialProfile {
    pub fn matches(&self, provider: &str, account_id: &str) -> bool {
        self.provider == provider && self.account_id == account_id
    }
}

/// The on-disk shape of `auth.json`.
///
/// Insertion order is preserved so exports stay deterministic. The
/// `(provider, accountId)` pair is unique across the collection, enforced
/// by [`KeyringCollection::upsert`], the only way a profile gets in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyringCollection {
    #[serde(default)]
    pub profiles: Vec<CredentialProfile>,
}

impl KeyringCollection {
    pub fn find(&self, provider: &str, account_id: &str) -> Option<&CredentialProfile> {
        self.profiles.iter().find(|p| p.matches(provider, account_id))
    }

    /// Insert-or-update by `(provider, accountId)`. An existing profile is
    /// replaced in place, keeping its position.
    pub fn upsert(&mut self, profile: CredentialProfile) {
        match self
            .profiles
            .iter_mut()
            .find(|p| p.matches(&profile.provider, &profile.account_id))
        {
            Some(slot) => *slot = profile,
            None => self.profiles.push(profile),
        }
    }

    /// Drop the profile for `(provider, accountId)`. Returns whether one
    /// existed.
    pub fn remove(&mut self, provider: &str, account_id: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| !p.matches(provider, account_id));
        self.profiles.len() != before
    }
}
