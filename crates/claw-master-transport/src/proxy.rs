//! Same-origin pass-through to the platform APIs.
//!
//! Browsers cannot call the platforms directly because of CORS, so the
//! dashboard sends `/proxy/<namespace>/<path>` here and the request is
//! replayed against that platform's base URL.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, header},
    response::{IntoResponse, Response},
    routing::any,
};
use claw_master_core::Platform;

use crate::error::ApiFailure;

/// Request headers copied to the upstream request.
const FORWARDED_HEADERS: [header::HeaderName; 3] =
    [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

/// Proxy handler state.
#[derive(Clone)]
pub struct ProxyState {
    http: reqwest::Client,
    upstreams: Arc<HashMap<Platform, String>>,
}

impl ProxyState {
    /// Create proxy state forwarding each platform to its base URL.
    #[must_use]
    pub fn new(http: reqwest::Client, upstreams: HashMap<Platform, String>) -> Self {
        let upstreams = upstreams
            .into_iter()
            .map(|(platform, base)| (platform, base.trim_end_matches('/').to_string()))
            .collect();
        Self {
            http,
            upstreams: Arc::new(upstreams),
        }
    }

    fn upstream_url(&self, namespace: &str, path: &str, query: Option<&str>) -> Option<String> {
        let platform = Platform::from_namespace(namespace)?;
        let base = self.upstreams.get(&platform)?;
        let mut url = format!("{base}/{}", path.trim_start_matches('/'));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        Some(url)
    }
}

/// Create the proxy router.
pub fn proxy_router(state: ProxyState) -> Router {
    Router::new()
        .route("/proxy/{platform}/{*path}", any(forward))
        .with_state(state)
}

async fn forward(
    State(state): State<ProxyState>,
    Path((namespace, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiFailure> {
    let url = state
        .upstream_url(&namespace, &path, query.as_deref())
        .ok_or_else(|| ApiFailure::not_found(format!("unknown platform: {namespace}")))?;

    let mut request = state.http.request(method.clone(), &url).body(body);
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(&name) {
            request = request.header(name, value.clone());
        }
    }

    let upstream = request.send().await.map_err(|e| {
        tracing::warn!(%method, %url, "proxy request failed: {e}");
        ApiFailure::bad_gateway(format!("upstream request failed: {e}"))
    })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| ApiFailure::bad_gateway(format!("upstream body failed: {e}")))?;
    tracing::debug!(%method, %url, %status, "proxied");

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}
