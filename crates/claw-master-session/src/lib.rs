//! Per-platform agent identity and session management.
//!
//! Provides:
//! - `AgentSessionManager` - Saved identities plus the active session of one platform
//! - Storage implementations (memory, JSON file)

pub mod manager;
pub mod storage;

pub use manager::{AgentSessionManager, DEFAULT_AGENT_NAME, ManagerError};
