//! JSON bodies exchanged with the dashboard UI.
//!
//! Views never carry a raw credential token, only its masked form.

use chrono::{DateTime, Utc};
use claw_master_core::{
    ActiveSession, CredentialToken, IdentityId, Platform, SavedAgentIdentity, SessionState,
};
use serde::{Deserialize, Serialize};

/// A saved identity as shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: IdentityId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_handle: Option<String>,
    pub platform: Platform,
    pub masked_token: String,
    pub added_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    /// Whether this identity backs the active session.
    pub active: bool,
}

impl IdentityView {
    #[must_use]
    pub fn new(identity: &SavedAgentIdentity, active_id: Option<&str>) -> Self {
        Self {
            id: identity.id.clone(),
            display_name: identity.display_name.clone(),
            platform_handle: identity.platform_handle.clone(),
            platform: identity.platform,
            masked_token: identity.masked_token(),
            added_at: identity.added_at,
            last_used_at: identity.last_used_at,
            active: active_id == Some(identity.id.as_str()),
        }
    }
}

/// The active session of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView<P> {
    pub platform: Platform,
    pub state: SessionState,
    pub active_identity_id: Option<IdentityId>,
    pub masked_token: Option<String>,
    pub profile: Option<P>,
    pub agent_runtime_enabled: bool,
}

impl<P> SessionView<P> {
    #[must_use]
    pub fn new(
        platform: Platform,
        state: SessionState,
        active: ActiveSession<P>,
        agent_runtime_enabled: bool,
    ) -> Self {
        Self {
            platform,
            state,
            active_identity_id: active.active_identity_id,
            masked_token: active.credential_token.as_ref().map(CredentialToken::masked),
            profile: active.cached_profile,
            agent_runtime_enabled,
        }
    }
}

/// Body of `POST /identities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddIdentityRequest {
    pub token: CredentialToken,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Body of `PATCH /identities/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameIdentityRequest {
    pub display_name: String,
}

/// Body of `POST /session/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub token: CredentialToken,
}

/// Body of `PUT /session/runtime`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentRuntimeRequest {
    pub enabled: bool,
}

/// Response of `POST /register`.
///
/// The only response that carries a full API key, shown once so the
/// operator can keep a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub identity: IdentityView,
    pub api_key: CredentialToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

/// Error body returned by every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
