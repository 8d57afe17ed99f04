//! Locally saved agent identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CredentialToken, Platform};

/// Opaque identity identifier.
pub type IdentityId = String;

/// An agent credential registered in the dashboard.
///
/// Within one platform the `credential_token` is unique: adding the same
/// token twice updates the existing record instead of creating another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAgentIdentity {
    /// Unique identifier, generated at creation time.
    pub id: IdentityId,
    /// Platform API key presented for authenticated calls.
    pub credential_token: CredentialToken,
    /// User-editable label.
    pub display_name: String,
    /// Platform-assigned handle, when the platform has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_handle: Option<String>,
    /// Partition this identity belongs to.
    pub platform: Platform,
    pub added_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl SavedAgentIdentity {
    /// Create a new identity with a fresh id.
    #[must_use]
    pub fn new(
        platform: Platform,
        credential_token: impl Into<CredentialToken>,
        display_name: impl Into<String>,
        platform_handle: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            credential_token: credential_token.into(),
            display_name: display_name.into(),
            platform_handle,
            platform,
            added_at: now,
            last_used_at: now,
        }
    }

    /// Credential token safe for display.
    #[must_use]
    pub fn masked_token(&self) -> String {
        self.credential_token.masked()
    }
}
