//! Core data model and ports for Claw Master agent sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `SavedAgentIdentity` / `ActiveSession` - Per-platform identity and session model
//! - `SessionEvent` / `EventHub` - Broadcast of session state changes
//! - `KeyValueStore` and `ProfileFetcher` ports
//! - `ClawMasterConfig` - Environment-driven configuration

pub mod config;
pub mod credential;
pub mod events;
pub mod identity;
pub mod platform;
pub mod session;
pub mod traits;

pub use config::{ClawMasterConfig, ConfigError};
pub use credential::{CredentialToken, mask_token};
pub use events::{EventHub, SessionEvent};
pub use identity::{IdentityId, SavedAgentIdentity};
pub use platform::{Platform, StorageKeys};
pub use session::{ActiveSession, SessionState};
pub use traits::{AgentProfile, KeyValueStore, ProfileFetcher, ProfileOutcome, StorageError};
