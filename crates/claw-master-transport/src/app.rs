//! The assembled dashboard backend.

use std::{collections::HashMap, sync::Arc};

use axum::{Json, Router, routing::get};
use claw_master_core::{ClawMasterConfig, Platform, StorageError};
use claw_master_platforms::{ClawNewsClient, MoltbookClient, PlatformClient};
use claw_master_session::{AgentSessionManager, ManagerError, storage::JsonFileStore};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::platform_router,
    proxy::{ProxyState, proxy_router},
};

/// Errors raised while starting the backend.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to load sessions: {0}")]
    Manager(#[from] ManagerError),
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub type MoltbookManager = AgentSessionManager<Arc<JsonFileStore>, MoltbookClient>;
pub type ClawNewsManager = AgentSessionManager<Arc<JsonFileStore>, ClawNewsClient>;

/// One session manager per platform over a shared storage file.
#[derive(Clone)]
pub struct ClawMaster {
    pub moltbook: Arc<MoltbookManager>,
    pub clawnews: Arc<ClawNewsManager>,
    proxy: ProxyState,
}

impl ClawMaster {
    /// Open storage and restore both platforms' sessions.
    ///
    /// # Errors
    /// Returns error if the storage file is unreadable or corrupt, or the
    /// HTTP client cannot be built.
    pub async fn from_config(config: &ClawMasterConfig) -> Result<Self, StartupError> {
        let store = Arc::new(JsonFileStore::open(config.storage_path()).await?);
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let moltbook = MoltbookClient::new(PlatformClient::with_http(
            http.clone(),
            config.moltbook_base_url.as_str(),
        ));
        let clawnews = ClawNewsClient::new(PlatformClient::with_http(
            http.clone(),
            config.clawnews_base_url.as_str(),
        ));
        let proxy = ProxyState::new(
            http,
            HashMap::from([
                (Platform::Moltbook, config.moltbook_base_url.clone()),
                (Platform::ClawNews, config.clawnews_base_url.clone()),
            ]),
        );

        let moltbook = AgentSessionManager::load(Arc::clone(&store), moltbook).await?;
        let clawnews = AgentSessionManager::load(store, clawnews).await?;
        tracing::info!(
            path = %config.storage_path().display(),
            moltbook = moltbook.identities().await.len(),
            clawnews = clawnews.identities().await.len(),
            "restored saved identities"
        );

        Ok(Self {
            moltbook: Arc::new(moltbook),
            clawnews: Arc::new(clawnews),
            proxy,
        })
    }

    /// Build the HTTP router for the dashboard.
    pub fn router(&self) -> Router {
        Router::new()
            .nest(
                &format!("/api/{}", Platform::Moltbook.namespace()),
                platform_router(Arc::clone(&self.moltbook)),
            )
            .nest(
                &format!("/api/{}", Platform::ClawNews.namespace()),
                platform_router(Arc::clone(&self.clawnews)),
            )
            .merge(proxy_router(self.proxy.clone()))
            .route("/health", get(health))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
