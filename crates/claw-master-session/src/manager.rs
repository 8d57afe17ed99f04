//! Session manager for one platform's agent identities.

use chrono::Utc;
use claw_master_core::{
    ActiveSession, CredentialToken, EventHub, IdentityId, Platform, SavedAgentIdentity,
    SessionEvent, SessionState, StorageKeys,
    traits::{AgentProfile, KeyValueStore, ProfileFetcher, ProfileOutcome, StorageError},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{RwLock, RwLockWriteGuard, broadcast};

/// Name used for an agent whose profile the platform will not reveal yet.
pub const DEFAULT_AGENT_NAME: &str = "Agent";

/// Session manager error.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Identity not found: {0}")]
    NotFound(IdentityId),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Platform unavailable: {0}")]
    Transient(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
struct ManagerState<P> {
    identities: Vec<SavedAgentIdentity>,
    active: ActiveSession<P>,
    agent_runtime_enabled: bool,
}

impl<P> ManagerState<P> {
    /// Empty the active session and switch the agent runtime off.
    fn clear_session(&mut self) {
        self.active = ActiveSession::default();
        self.agent_runtime_enabled = false;
    }
}

/// Saved identities and the active session of one platform.
///
/// Every mutation is written to storage before it becomes visible, so a
/// manager rebuilt with [`AgentSessionManager::load`] from the same store
/// observes identical state. A mutation whose write fails is not applied.
pub struct AgentSessionManager<S, F>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    storage: S,
    fetcher: F,
    platform: Platform,
    keys: StorageKeys,
    state: RwLock<ManagerState<F::Profile>>,
    events: EventHub,
}

impl<S, F> AgentSessionManager<S, F>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    /// Build a manager from whatever `storage` holds for the fetcher's platform.
    ///
    /// # Errors
    /// Returns error if stored values cannot be read or decoded.
    pub async fn load(storage: S, fetcher: F) -> Result<Self, ManagerError> {
        let platform = fetcher.platform();
        let keys = StorageKeys::for_platform(platform);

        let identities: Vec<SavedAgentIdentity> = load_key(&storage, &keys.saved_identities)
            .await?
            .unwrap_or_default();
        let identities: Vec<SavedAgentIdentity> = identities
            .into_iter()
            .filter(|identity| {
                let matches = identity.platform == platform;
                if !matches {
                    tracing::warn!(
                        %platform,
                        id = %identity.id,
                        "dropping stored identity from another platform"
                    );
                }
                matches
            })
            .collect();

        let active = ActiveSession {
            active_identity_id: load_key(&storage, &keys.active_identity_id).await?,
            credential_token: load_key(&storage, &keys.active_credential_token).await?,
            cached_profile: load_key(&storage, &keys.cached_profile).await?,
        };
        let agent_runtime_enabled = load_key(&storage, &keys.agent_runtime_enabled)
            .await?
            .unwrap_or(false);

        tracing::info!(
            %platform,
            identities = identities.len(),
            logged_in = active.is_logged_in(),
            "loaded agent sessions"
        );

        Ok(Self {
            storage,
            fetcher,
            platform,
            keys,
            state: RwLock::new(ManagerState {
                identities,
                active,
                agent_runtime_enabled,
            }),
            events: EventHub::new(),
        })
    }

    /// Platform this manager owns.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Remote profile access for this platform.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Event hub publishing every state change.
    #[must_use]
    pub const fn events(&self) -> &EventHub {
        &self.events
    }

    /// Get a receiver for live session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// All saved identities, in insertion order.
    pub async fn identities(&self) -> Vec<SavedAgentIdentity> {
        self.state.read().await.identities.clone()
    }

    /// Get a saved identity by id.
    pub async fn identity(&self, id: &str) -> Option<SavedAgentIdentity> {
        self.state
            .read()
            .await
            .identities
            .iter()
            .find(|identity| identity.id == id)
            .cloned()
    }

    /// Snapshot of the active session.
    pub async fn active_session(&self) -> ActiveSession<F::Profile> {
        self.state.read().await.active.clone()
    }

    /// Current login state.
    pub async fn session_state(&self) -> SessionState {
        self.state.read().await.active.state()
    }

    /// Whether the agent runtime (heartbeat) is switched on.
    pub async fn agent_runtime_enabled(&self) -> bool {
        self.state.read().await.agent_runtime_enabled
    }

    /// Verify `token` with the platform and save it as an identity.
    ///
    /// Adding a token that is already saved updates that identity's
    /// display name (when `display_name` is given) and last-used time.
    /// When the token is the active credential, the session is linked to
    /// the saved identity.
    ///
    /// # Errors
    /// Returns error if the token is empty, the platform rejects it or
    /// cannot be reached, or storage fails.
    pub async fn add_identity(
        &self,
        token: &str,
        display_name: Option<&str>,
    ) -> Result<SavedAgentIdentity, ManagerError> {
        let token = require_token(token)?;
        let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());
        let profile = self
            .authenticate(token, display_name.unwrap_or(DEFAULT_AGENT_NAME))
            .await?;

        let now = Utc::now();
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let existing = next
            .identities
            .iter_mut()
            .find(|identity| identity.credential_token == token);

        let (identity, event) = if let Some(existing) = existing {
            if let Some(name) = display_name {
                existing.display_name = name.to_string();
            }
            existing.last_used_at = now;
            let identity = existing.clone();
            let event = SessionEvent::IdentityUpdated {
                id: identity.id.clone(),
            };
            (identity, event)
        } else {
            let identity = SavedAgentIdentity::new(
                self.platform,
                token,
                display_name.unwrap_or_else(|| profile.name()),
                profile.handle().map(str::to_string),
                now,
            );
            next.identities.push(identity.clone());
            let event = SessionEvent::IdentityAdded {
                id: identity.id.clone(),
            };
            (identity, event)
        };

        let links_active = next.active.active_identity_id.is_none()
            && next
                .active
                .credential_token
                .as_ref()
                .is_some_and(|active| *active == token);
        if links_active {
            next.active.active_identity_id = Some(identity.id.clone());
        }

        self.commit(&mut state, next).await?;
        drop(state);

        tracing::info!(
            platform = %self.platform,
            id = %identity.id,
            event = event.name(),
            links_active,
            "saved identity"
        );
        self.events.publish(event);
        Ok(identity)
    }

    /// Delete a saved identity. Removing the active identity logs out.
    ///
    /// Returns whether an identity was removed; unknown ids are a no-op.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn remove_identity(&self, id: &str) -> Result<bool, ManagerError> {
        let mut state = self.state.write().await;
        let Some(position) = state.identities.iter().position(|identity| identity.id == id) else {
            return Ok(false);
        };

        let mut next = state.clone();
        next.identities.remove(position);
        let was_active = next.active.active_identity_id.as_deref() == Some(id);
        if was_active {
            next.clear_session();
        }

        self.commit(&mut state, next).await?;
        drop(state);

        tracing::info!(platform = %self.platform, id, was_active, "removed identity");
        self.events.publish(SessionEvent::IdentityRemoved { id: id.to_string() });
        if was_active {
            self.events.publish(SessionEvent::LoggedOut);
        }
        Ok(true)
    }

    /// Make a saved identity the active session.
    ///
    /// The identity's token is verified with the platform first; if that
    /// or the following write fails the previous session is left exactly
    /// as it was.
    ///
    /// # Errors
    /// Returns error if the id is unknown, authentication fails, or
    /// storage fails.
    pub async fn switch_identity(&self, id: &str) -> Result<(), ManagerError> {
        let identity = self
            .identity(id)
            .await
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;

        let profile = self
            .authenticate(identity.credential_token.expose(), &identity.display_name)
            .await?;
        let claimed = profile.is_claimed();

        let mut state = self.state.write().await;
        let mut next = state.clone();
        let entry = next
            .identities
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
        entry.last_used_at = Utc::now();

        let runtime_reset = next.agent_runtime_enabled
            && next.active.credential_token.as_ref() != Some(&identity.credential_token);
        next.active = ActiveSession {
            active_identity_id: Some(identity.id.clone()),
            credential_token: Some(identity.credential_token.clone()),
            cached_profile: Some(profile),
        };
        if runtime_reset {
            next.agent_runtime_enabled = false;
        }

        self.commit(&mut state, next).await?;
        drop(state);

        tracing::info!(platform = %self.platform, id, claimed, "switched identity");
        if runtime_reset {
            self.events
                .publish(SessionEvent::AgentRuntimeChanged { enabled: false });
        }
        self.events.publish(SessionEvent::LoggedIn {
            identity_id: Some(identity.id),
            claimed,
        });
        Ok(())
    }

    /// Change an identity's display name. No remote call is made.
    ///
    /// # Errors
    /// Returns error if the name is empty, the id is unknown, or storage fails.
    pub async fn rename_identity(
        &self,
        id: &str,
        new_name: &str,
    ) -> Result<SavedAgentIdentity, ManagerError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ManagerError::Validation(
                "display name must not be empty".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let mut next = state.clone();
        let entry = next
            .identities
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
        entry.display_name = new_name.to_string();
        let identity = entry.clone();

        self.commit(&mut state, next).await?;
        drop(state);

        self.events.publish(SessionEvent::IdentityUpdated { id: identity.id.clone() });
        Ok(identity)
    }

    /// Re-fetch the active agent's profile.
    ///
    /// An unclaimed agent keeps its session with a placeholder profile, a
    /// rejected credential logs out, and transient failures leave the
    /// session untouched. Does nothing while logged out.
    ///
    /// # Errors
    /// Returns error only if storage fails.
    pub async fn refresh_active_profile(&self) -> Result<SessionState, ManagerError> {
        let Some(token) = self.state.read().await.active.credential_token.clone() else {
            return Ok(SessionState::LoggedOut);
        };

        let outcome = self.fetcher.fetch_profile(token.expose()).await;

        let mut state = self.state.write().await;
        if state.active.credential_token.as_ref() != Some(&token) {
            tracing::debug!(platform = %self.platform, "session changed during refresh, discarding result");
            return Ok(state.active.state());
        }

        let mut next = state.clone();
        let event = match outcome {
            ProfileOutcome::Profile(profile) => {
                let claimed = profile.is_claimed();
                next.active.cached_profile = Some(profile);
                SessionEvent::ProfileRefreshed { claimed }
            }
            ProfileOutcome::Unclaimed { claim_url } => {
                let previous = next.active.cached_profile.as_ref();
                let name = previous.map_or(DEFAULT_AGENT_NAME, |p| p.name()).to_string();
                let claim_url =
                    claim_url.or_else(|| previous.and_then(|p| p.claim_url().map(str::to_string)));
                next.active.cached_profile =
                    Some(F::Profile::unclaimed_placeholder(name, claim_url));
                SessionEvent::ProfileRefreshed { claimed: false }
            }
            ProfileOutcome::Unauthorized(detail) => {
                tracing::warn!(platform = %self.platform, %detail, "credential rejected, logging out");
                next.clear_session();
                SessionEvent::LoggedOut
            }
            ProfileOutcome::Transient(detail) => {
                tracing::warn!(platform = %self.platform, %detail, "profile refresh failed, keeping session");
                return Ok(state.active.state());
            }
        };

        self.commit(&mut state, next).await?;
        let session_state = state.active.state();
        drop(state);

        self.events.publish(event);
        Ok(session_state)
    }

    /// Verify `token` with the platform and make it the active credential.
    ///
    /// Does not save an identity; when the token belongs to a saved
    /// identity, the session points at it.
    ///
    /// # Errors
    /// Returns error if the token is empty, the platform rejects it or
    /// cannot be reached, or storage fails.
    pub async fn login(&self, token: &str) -> Result<SessionState, ManagerError> {
        let token = require_token(token)?;
        let profile = self.authenticate(token, DEFAULT_AGENT_NAME).await?;
        let claimed = profile.is_claimed();

        let mut state = self.state.write().await;
        let mut next = state.clone();
        let identity_id = next
            .identities
            .iter()
            .find(|identity| identity.credential_token == token)
            .map(|identity| identity.id.clone());

        let runtime_reset = next.agent_runtime_enabled
            && !next
                .active
                .credential_token
                .as_ref()
                .is_some_and(|active| *active == token);
        next.active = ActiveSession {
            active_identity_id: identity_id.clone(),
            credential_token: Some(CredentialToken::from(token)),
            cached_profile: Some(profile),
        };
        if runtime_reset {
            next.agent_runtime_enabled = false;
        }

        self.commit(&mut state, next).await?;
        let session_state = state.active.state();
        drop(state);

        tracing::info!(platform = %self.platform, claimed, "logged in");
        if runtime_reset {
            self.events
                .publish(SessionEvent::AgentRuntimeChanged { enabled: false });
        }
        self.events.publish(SessionEvent::LoggedIn { identity_id, claimed });
        Ok(session_state)
    }

    /// Clear the active session and the agent runtime flag.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn logout(&self) -> Result<(), ManagerError> {
        let mut state = self.state.write().await;
        if state.active.is_empty() && !state.agent_runtime_enabled {
            return Ok(());
        }
        let mut next = state.clone();
        next.clear_session();
        self.commit(&mut state, next).await?;
        drop(state);

        tracing::info!(platform = %self.platform, "logged out");
        self.events.publish(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Switch the agent runtime (heartbeat) on or off.
    ///
    /// # Errors
    /// Returns error if enabling while logged out, or storage fails.
    pub async fn set_agent_runtime(&self, enabled: bool) -> Result<(), ManagerError> {
        let mut state = self.state.write().await;
        if enabled && !state.active.is_logged_in() {
            return Err(ManagerError::Validation(
                "agent runtime requires an active session".to_string(),
            ));
        }
        if state.agent_runtime_enabled == enabled {
            return Ok(());
        }

        let mut next = state.clone();
        next.agent_runtime_enabled = enabled;
        self.commit(&mut state, next).await?;
        drop(state);

        tracing::info!(platform = %self.platform, enabled, "agent runtime toggled");
        self.events.publish(SessionEvent::AgentRuntimeChanged { enabled });
        Ok(())
    }

    async fn authenticate(
        &self,
        token: &str,
        fallback_name: &str,
    ) -> Result<F::Profile, ManagerError> {
        match self.fetcher.fetch_profile(token).await {
            ProfileOutcome::Profile(profile) => Ok(profile),
            ProfileOutcome::Unclaimed { claim_url } => Ok(F::Profile::unclaimed_placeholder(
                fallback_name.to_string(),
                claim_url,
            )),
            ProfileOutcome::Unauthorized(detail) => Err(ManagerError::Authentication(detail)),
            ProfileOutcome::Transient(detail) => Err(ManagerError::Transient(detail)),
        }
    }

    /// Persist `next` and make it the live state.
    ///
    /// On a failed write the live state is kept and the keys already
    /// written are put back to their previous values.
    async fn commit(
        &self,
        state: &mut RwLockWriteGuard<'_, ManagerState<F::Profile>>,
        next: ManagerState<F::Profile>,
    ) -> Result<(), ManagerError> {
        if let Err(err) = self.persist_changes(&**state, &next).await {
            if let Err(restore_err) = self.persist_changes(&next, &**state).await {
                tracing::error!(
                    platform = %self.platform,
                    "failed to restore storage after write error: {restore_err}"
                );
            }
            return Err(err);
        }
        **state = next;
        Ok(())
    }

    /// Write every key whose value differs between `from` and `to`.
    async fn persist_changes(
        &self,
        from: &ManagerState<F::Profile>,
        to: &ManagerState<F::Profile>,
    ) -> Result<(), ManagerError> {
        if from.identities != to.identities {
            save_key(
                &self.storage,
                &self.keys.saved_identities,
                Some(to.identities.as_slice()),
            )
            .await?;
        }
        if from.active.active_identity_id != to.active.active_identity_id {
            save_key(
                &self.storage,
                &self.keys.active_identity_id,
                to.active.active_identity_id.as_ref(),
            )
            .await?;
        }
        if from.active.credential_token != to.active.credential_token {
            save_key(
                &self.storage,
                &self.keys.active_credential_token,
                to.active.credential_token.as_ref(),
            )
            .await?;
        }
        if from.active.cached_profile != to.active.cached_profile {
            save_key(
                &self.storage,
                &self.keys.cached_profile,
                to.active.cached_profile.as_ref(),
            )
            .await?;
        }
        if from.agent_runtime_enabled != to.agent_runtime_enabled {
            save_key(
                &self.storage,
                &self.keys.agent_runtime_enabled,
                to.agent_runtime_enabled.then_some(&true),
            )
            .await?;
        }
        Ok(())
    }
}

fn require_token(token: &str) -> Result<&str, ManagerError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ManagerError::Validation(
            "credential token must not be empty".to_string(),
        ));
    }
    Ok(token)
}

async fn load_key<S, T>(storage: &S, key: &str) -> Result<Option<T>, ManagerError>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let Some(value) = storage.load(key).await? else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let decoded = serde_json::from_value(value).map_err(StorageError::from)?;
    Ok(Some(decoded))
}

/// Save `value` under `key`, or remove the key when `value` is `None`.
async fn save_key<S, T>(storage: &S, key: &str, value: Option<&T>) -> Result<(), ManagerError>
where
    S: KeyValueStore,
    T: Serialize + ?Sized,
{
    match value {
        Some(value) => {
            let json = serde_json::to_value(value).map_err(StorageError::from)?;
            tracing::debug!(key, "persisting");
            storage.save(key, json).await?;
        }
        None => {
            tracing::debug!(key, "clearing");
            storage.remove(key).await?;
        }
    }
    Ok(())
}
