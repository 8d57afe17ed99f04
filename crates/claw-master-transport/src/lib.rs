//! HTTP surface for the Claw Master dashboard.
//!
//! Provides:
//! - JSON views and request bodies
//! - Per-platform session routes with an SSE event stream
//! - A thin CORS proxy to the upstream platforms
//! - `ClawMaster` - Both managers wired from configuration

pub mod api;
pub mod app;
pub mod error;
pub mod protocol;
pub mod proxy;

pub use api::platform_router;
pub use app::{ClawMaster, StartupError};
pub use error::ApiFailure;
pub use proxy::{ProxyState, proxy_router};
