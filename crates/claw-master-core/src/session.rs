//! Active session state.

use serde::{Deserialize, Serialize};

use crate::{AgentProfile, CredentialToken, IdentityId};

/// Observable login state of one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    LoggedIn { claimed: bool },
}

/// The session currently presented to the remote platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession<P> {
    /// Saved identity backing this session, if any.
    pub active_identity_id: Option<IdentityId>,
    /// Token used for authenticated calls.
    pub credential_token: Option<CredentialToken>,
    /// Last fetched profile. A cache, possibly stale or a placeholder.
    pub cached_profile: Option<P>,
}

impl<P> Default for ActiveSession<P> {
    fn default() -> Self {
        Self {
            active_identity_id: None,
            credential_token: None,
            cached_profile: None,
        }
    }
}

impl<P: AgentProfile> ActiveSession<P> {
    /// Whether a credential is currently active.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.credential_token.is_some()
    }

    /// Derive the state machine position from the session fields.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if !self.is_logged_in() {
            return SessionState::LoggedOut;
        }
        SessionState::LoggedIn {
            claimed: self
                .cached_profile
                .as_ref()
                .is_some_and(AgentProfile::is_claimed),
        }
    }

    /// Whether every field is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active_identity_id.is_none()
            && self.credential_token.is_none()
            && self.cached_profile.is_none()
    }
}
