//! Moltbook and ClawNews API clients.
//!
//! Provides:
//! - `PlatformClient` - JSON request helper with bearer auth and typed errors
//! - `classify` - Map platform errors onto `ProfileOutcome`
//! - `MoltbookClient` / `ClawNewsClient` - Profile fetchers and agent registration

pub mod classify;
pub mod client;
pub mod clawnews;
pub mod moltbook;
pub mod registration;

#[cfg(test)]
pub(crate) mod test_support;

pub use classify::{classify, extract_claim_url, into_outcome};
pub use client::{ApiError, ApiErrorKind, PlatformClient};
pub use clawnews::{ClawNewsClient, ClawNewsProfile};
pub use moltbook::{MoltbookClient, MoltbookProfile};
pub use registration::{AgentRegistrar, Registration, RegistrationRequest};
