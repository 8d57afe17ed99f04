//! Moltbook, the Reddit-like agent community.

use async_trait::async_trait;
use claw_master_core::{AgentProfile, Platform, ProfileFetcher, ProfileOutcome};
use serde::{Deserialize, Serialize};

use crate::{
    AgentRegistrar, ApiError, PlatformClient, Registration, RegistrationRequest,
    client::AgentEnvelope, into_outcome,
};

const PROFILE_PATH: &str = "/agents/me";
const REGISTER_PATH: &str = "/agents/register";

/// Moltbook agent profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawMoltbookProfile")]
pub struct MoltbookProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub is_claimed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_url: Option<String>,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub following_count: u64,
}

/// Wire form of [`MoltbookProfile`]. Older responses say `claimed`
/// instead of `is_claimed`; either or both may be present.
#[derive(Deserialize)]
struct RawMoltbookProfile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    karma: i64,
    #[serde(default)]
    is_claimed: Option<bool>,
    #[serde(default)]
    claimed: Option<bool>,
    #[serde(default)]
    claim_url: Option<String>,
    #[serde(default)]
    follower_count: u64,
    #[serde(default)]
    following_count: u64,
}

impl From<RawMoltbookProfile> for MoltbookProfile {
    fn from(raw: RawMoltbookProfile) -> Self {
        Self {
            name: raw.name,
            description: raw.description,
            karma: raw.karma,
            is_claimed: raw.is_claimed.or(raw.claimed).unwrap_or(false),
            claim_url: raw.claim_url,
            follower_count: raw.follower_count,
            following_count: raw.following_count,
        }
    }
}

impl AgentProfile for MoltbookProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_claimed(&self) -> bool {
        self.is_claimed
    }

    fn claim_url(&self) -> Option<&str> {
        self.claim_url.as_deref()
    }

    fn unclaimed_placeholder(name: String, claim_url: Option<String>) -> Self {
        Self {
            name,
            description: None,
            karma: 0,
            is_claimed: false,
            claim_url,
            follower_count: 0,
            following_count: 0,
        }
    }
}

/// Moltbook API client.
#[derive(Debug, Clone)]
pub struct MoltbookClient {
    client: PlatformClient,
}

impl MoltbookClient {
    #[must_use]
    pub const fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Underlying request helper.
    #[must_use]
    pub const fn client(&self) -> &PlatformClient {
        &self.client
    }
}

#[async_trait]
impl ProfileFetcher for MoltbookClient {
    type Profile = MoltbookProfile;

    fn platform(&self) -> Platform {
        Platform::Moltbook
    }

    async fn fetch_profile(&self, token: &str) -> ProfileOutcome<MoltbookProfile> {
        let result = self
            .client
            .get_json::<AgentEnvelope<MoltbookProfile>>(PROFILE_PATH, Some(token))
            .await
            .map(AgentEnvelope::into_inner);
        into_outcome(result)
    }
}

#[async_trait]
impl AgentRegistrar for MoltbookClient {
    async fn register(&self, request: &RegistrationRequest) -> Result<Registration, ApiError> {
        let registration = self
            .client
            .post_json::<_, AgentEnvelope<Registration>>(REGISTER_PATH, None, request)
            .await?
            .into_inner();
        tracing::info!(platform = %Platform::Moltbook, name = %request.name, "registered agent");
        Ok(registration)
    }
}
