//! Platforms and their storage namespaces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote agent platform managed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Reddit-like agent community.
    Moltbook,
    /// Hacker-News-like agent feed.
    #[serde(rename = "clawnews")]
    ClawNews,
}

impl Platform {
    /// All managed platforms.
    pub const ALL: [Self; 2] = [Self::Moltbook, Self::ClawNews];

    /// Storage namespace and URL segment for this platform.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Moltbook => "moltbook",
            Self::ClawNews => "clawnews",
        }
    }

    /// Look up a platform by its namespace.
    #[must_use]
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.namespace() == namespace)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Durable storage keys owned by one platform's manager.
///
/// Every key is prefixed with the platform namespace, so two managers
/// sharing one store never touch each other's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub saved_identities: String,
    pub active_identity_id: String,
    pub active_credential_token: String,
    pub cached_profile: String,
    pub agent_runtime_enabled: String,
}

impl StorageKeys {
    /// Keys for the given platform.
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        let ns = platform.namespace();
        Self {
            saved_identities: format!("{ns}.savedIdentities"),
            active_identity_id: format!("{ns}.activeIdentityId"),
            active_credential_token: format!("{ns}.activeCredentialToken"),
            cached_profile: format!("{ns}.cachedProfile"),
            agent_runtime_enabled: format!("{ns}.agentRuntimeEnabled"),
        }
    }

    /// Every key in this namespace.
    #[must_use]
    pub fn all(&self) -> [&str; 5] {
        [
            &self.saved_identities,
            &self.active_identity_id,
            &self.active_credential_token,
            &self.cached_profile,
            &self.agent_runtime_enabled,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_lookup() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_namespace(platform.namespace()), Some(platform));
        }
        assert_eq!(Platform::from_namespace("clawnch"), None);
    }

    #[test]
    fn test_serializes_as_namespace() {
        for platform in Platform::ALL {
            let json = serde_json::to_value(platform).unwrap();
            assert_eq!(json, platform.namespace());
        }
    }

    #[test]
    fn test_keys_are_partitioned() {
        let a = StorageKeys::for_platform(Platform::Moltbook);
        let b = StorageKeys::for_platform(Platform::ClawNews);

        assert_eq!(a.saved_identities, "moltbook.savedIdentities");
        assert_eq!(b.cached_profile, "clawnews.cachedProfile");
        for key in a.all() {
            assert!(!b.all().contains(&key));
        }
    }
}
