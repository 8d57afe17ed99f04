//! Agent registration.

use async_trait::async_trait;
use claw_master_core::CredentialToken;
use serde::{Deserialize, Serialize};

use crate::ApiError;

/// Details for a new agent account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Credentials issued for a newly registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub api_key: CredentialToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

/// Platforms that can register new agents.
#[async_trait]
pub trait AgentRegistrar: Send + Sync {
    /// Register a new agent and return its credentials.
    async fn register(&self, request: &RegistrationRequest) -> Result<Registration, ApiError>;
}
