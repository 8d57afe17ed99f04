//! ClawNews, the Hacker-News-like agent feed.

use async_trait::async_trait;
use claw_master_core::{AgentProfile, Platform, ProfileFetcher, ProfileOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AgentRegistrar, ApiError, PlatformClient, Registration, RegistrationRequest,
    client::AgentEnvelope, into_outcome,
};

const PROFILE_PATH: &str = "/agent/me";
const REGISTER_PATH: &str = "/agent/register";

/// ClawNews agent profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClawNewsProfile")]
pub struct ClawNewsProfile {
    /// Platform-assigned handle. Empty for a placeholder.
    #[serde(default)]
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub claimed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_url: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
}

/// Wire form of [`ClawNewsProfile`]. `name` and `verified` are accepted
/// alongside `display_name` and `claimed`; the latter win when both are sent.
#[derive(Deserialize)]
struct RawClawNewsProfile {
    #[serde(default)]
    handle: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    about: Option<String>,
    #[serde(default)]
    karma: i64,
    #[serde(default)]
    claimed: Option<bool>,
    #[serde(default)]
    verified: Option<bool>,
    #[serde(default)]
    claim_url: Option<String>,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
}

impl From<RawClawNewsProfile> for ClawNewsProfile {
    fn from(raw: RawClawNewsProfile) -> Self {
        Self {
            handle: raw.handle,
            display_name: raw.display_name.or(raw.name),
            about: raw.about,
            karma: raw.karma,
            claimed: raw.claimed.or(raw.verified).unwrap_or(false),
            claim_url: raw.claim_url,
            followers: raw.followers,
            following: raw.following,
        }
    }
}

impl AgentProfile for ClawNewsProfile {
    fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(self.handle.as_str())
    }

    fn handle(&self) -> Option<&str> {
        Some(self.handle.as_str()).filter(|handle| !handle.is_empty())
    }

    fn is_claimed(&self) -> bool {
        self.claimed
    }

    fn claim_url(&self) -> Option<&str> {
        self.claim_url.as_deref()
    }

    fn unclaimed_placeholder(name: String, claim_url: Option<String>) -> Self {
        Self {
            handle: String::new(),
            display_name: Some(name),
            about: None,
            karma: 0,
            claimed: false,
            claim_url,
            followers: 0,
            following: 0,
        }
    }
}

/// ClawNews API client.
#[derive(Debug, Clone)]
pub struct ClawNewsClient {
    client: PlatformClient,
}

impl ClawNewsClient {
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
impl ProfileFetcher for ClawNewsClient {
    type Profile = ClawNewsProfile;

    fn platform(&self) -> Platform {
        Platform::ClawNews
    }

    async fn fetch_profile(&self, token: &str) -> ProfileOutcome<ClawNewsProfile> {
        let result = self
            .client
            .get_json::<AgentEnvelope<ClawNewsProfile>>(PROFILE_PATH, Some(token))
            .await
            .map(AgentEnvelope::into_inner);
        into_outcome(result)
    }
}

#[async_trait]
impl AgentRegistrar for ClawNewsClient {
    async fn register(&self, request: &RegistrationRequest) -> Result<Registration, ApiError> {
        let body = json!({
            "handle": request.name,
            "about": request.description,
        });
        let registration = self
            .client
            .post_json::<_, AgentEnvelope<Registration>>(REGISTER_PATH, None, &body)
            .await?
            .into_inner();
        tracing::info!(platform = %Platform::ClawNews, handle = %request.name, "registered agent");
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::Value;

    use super::*;
    use crate::test_support::serve;

    async fn me(headers: HeaderMap) -> impl IntoResponse {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer cn_good");
        if authorized {
            (
                StatusCode::OK,
                Json(json!({
                    "handle": "scout",
                    "name": "Scout",
                    "karma": 7,
                    "verified": false,
                    "claim_url": "https://clawnews.io/claim/cn_42",
                    "followers": 2
                })),
            )
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
        }
    }

    async fn register(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "api_key": format!("cn_{}", body["handle"].as_str().unwrap_or_default()),
            "claim_url": "https://clawnews.io/claim/cn_new"
        }))
    }

    async fn fake_clawnews() -> ClawNewsClient {
        let router = Router::new()
            .route("/agent/me", get(me))
            .route("/agent/register", post(register));
        let base = serve(router).await;
        ClawNewsClient::new(PlatformClient::new(base, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let clawnews = fake_clawnews().await;

        let ProfileOutcome::Profile(profile) = clawnews.fetch_profile("cn_good").await else {
            panic!("expected a profile");
        };
        assert_eq!(profile.name(), "Scout");
        assert_eq!(profile.handle(), Some("scout"));
        assert!(!profile.is_claimed());
        assert_eq!(profile.claim_url(), Some("https://clawnews.io/claim/cn_42"));

        assert!(matches!(
            clawnews.fetch_profile("cn_bad").await,
            ProfileOutcome::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn test_register_sends_handle() {
        let clawnews = fake_clawnews().await;
        let registration = clawnews
            .register(&RegistrationRequest {
                name: "scout".to_string(),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(registration.api_key, "cn_scout");
        assert_eq!(
            registration.claim_url.as_deref(),
            Some("https://clawnews.io/claim/cn_new")
        );
    }

    #[test]
    fn test_name_falls_back_to_handle() {
        let profile: ClawNewsProfile = serde_json::from_value(json!({ "handle": "h" })).unwrap();
        assert_eq!(profile.name(), "h");

        let placeholder = ClawNewsProfile::unclaimed_placeholder("Agent".to_string(), None);
        assert_eq!(placeholder.name(), "Agent");
        assert_eq!(placeholder.handle(), None);
    }

    #[test]
    fn test_alternate_keys_alongside_canonical_ones() {
        let profile: ClawNewsProfile = serde_json::from_value(json!({
            "handle": "scout",
            "display_name": "Scout",
            "name": "scout-legacy",
            "claimed": true,
            "verified": false
        }))
        .unwrap();
        assert_eq!(profile.name(), "Scout");
        assert!(profile.claimed);

        let legacy: ClawNewsProfile = serde_json::from_value(json!({
            "handle": "scout",
            "name": "Scout",
            "verified": true
        }))
        .unwrap();
        assert_eq!(legacy, profile);
    }
}
