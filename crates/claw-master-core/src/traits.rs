//! Core traits for persistence and remote profile access.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::Platform;

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Key-value persistence port.
///
/// Values are JSON documents. A missing key loads as `None`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Load the value stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<T> KeyValueStore for Arc<T>
where
    T: KeyValueStore + ?Sized,
{
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).save(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

/// Remote profile snapshot of an agent.
pub trait AgentProfile:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Platform-reported name, used as the default display name.
    fn name(&self) -> &str;

    /// Platform-assigned handle.
    fn handle(&self) -> Option<&str> {
        None
    }

    /// Whether a human has claimed (verified) the agent.
    fn is_claimed(&self) -> bool;

    /// URL where a human can claim the agent.
    fn claim_url(&self) -> Option<&str>;

    /// Profile standing in for an agent the platform reports as unclaimed.
    fn unclaimed_placeholder(name: String, claim_url: Option<String>) -> Self;
}

/// Result of a remote profile fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome<P> {
    /// The credential is valid and the profile was fetched.
    Profile(P),
    /// The agent exists but has not been claimed by a human yet.
    Unclaimed { claim_url: Option<String> },
    /// The platform rejected the credential.
    Unauthorized(String),
    /// Network, decode or server failure.
    Transient(String),
}

/// Platform-specific profile access.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Profile type returned by this platform.
    type Profile: AgentProfile;

    /// Platform this fetcher talks to.
    fn platform(&self) -> Platform;

    /// Fetch the profile of the agent owning `token`.
    async fn fetch_profile(&self, token: &str) -> ProfileOutcome<Self::Profile>;
}

#[async_trait]
impl<T> ProfileFetcher for Arc<T>
where
    T: ProfileFetcher + ?Sized,
{
    type Profile = T::Profile;

    fn platform(&self) -> Platform {
        (**self).platform()
    }

    async fn fetch_profile(&self, token: &str) -> ProfileOutcome<Self::Profile> {
        (**self).fetch_profile(token).await
    }
}
