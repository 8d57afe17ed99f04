//! Per-platform JSON API over an [`AgentSessionManager`].
//!
//! One router is built per platform and nested under `/api/<namespace>`.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, patch, post, put},
};
use claw_master_core::{KeyValueStore, ProfileFetcher};
use claw_master_platforms::{AgentRegistrar, RegistrationRequest};
use claw_master_session::AgentSessionManager;
use futures::{Stream, StreamExt};

use crate::{
    error::ApiFailure,
    protocol::{
        AddIdentityRequest, AgentRuntimeRequest, IdentityView, LoginRequest, RegisterResponse,
        RenameIdentityRequest, SessionView,
    },
};

type Manager<S, F> = Arc<AgentSessionManager<S, F>>;
type ApiResult<T> = Result<T, ApiFailure>;

/// Build the API router for one platform.
pub fn platform_router<S, F>(manager: Manager<S, F>) -> Router
where
    S: KeyValueStore + 'static,
    F: ProfileFetcher + AgentRegistrar + 'static,
{
    Router::new()
        .route(
            "/identities",
            get(list_identities::<S, F>).post(add_identity::<S, F>),
        )
        .route(
            "/identities/{id}",
            patch(rename_identity::<S, F>).delete(remove_identity::<S, F>),
        )
        .route("/identities/{id}/switch", post(switch_identity::<S, F>))
        .route("/session", get(get_session::<S, F>))
        .route("/session/login", post(login::<S, F>))
        .route("/session/logout", post(logout::<S, F>))
        .route("/session/refresh", post(refresh::<S, F>))
        .route("/session/runtime", put(set_runtime::<S, F>))
        .route("/register", post(register::<S, F>))
        .route("/events", get(events::<S, F>))
        .with_state(manager)
}

async fn session_view<S, F>(manager: &AgentSessionManager<S, F>) -> SessionView<F::Profile>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    let active = manager.active_session().await;
    SessionView::new(
        manager.platform(),
        active.state(),
        active,
        manager.agent_runtime_enabled().await,
    )
}

async fn identity_views<S, F>(manager: &AgentSessionManager<S, F>) -> Vec<IdentityView>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    let active = manager.active_session().await;
    let active_id = active.active_identity_id.as_deref();
    manager
        .identities()
        .await
        .iter()
        .map(|identity| IdentityView::new(identity, active_id))
        .collect()
}

async fn list_identities<S, F>(State(manager): State<Manager<S, F>>) -> Json<Vec<IdentityView>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    Json(identity_views(&manager).await)
}

async fn add_identity<S, F>(
    State(manager): State<Manager<S, F>>,
    Json(req): Json<AddIdentityRequest>,
) -> ApiResult<(StatusCode, Json<IdentityView>)>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    let identity = manager
        .add_identity(req.token.expose(), req.display_name.as_deref())
        .await?;
    let active = manager.active_session().await;
    let view = IdentityView::new(&identity, active.active_identity_id.as_deref());
    Ok((StatusCode::CREATED, Json(view)))
}

async fn rename_identity<S, F>(
    State(manager): State<Manager<S, F>>,
    Path(id): Path<String>,
    Json(req): Json<RenameIdentityRequest>,
) -> ApiResult<Json<IdentityView>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    let identity = manager.rename_identity(&id, &req.display_name).await?;
    let active = manager.active_session().await;
    Ok(Json(IdentityView::new(
        &identity,
        active.active_identity_id.as_deref(),
    )))
}

async fn remove_identity<S, F>(
    State(manager): State<Manager<S, F>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    if !manager.remove_identity(&id).await? {
        tracing::debug!(platform = %manager.platform(), %id, "remove of unknown identity");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn switch_identity<S, F>(
    State(manager): State<Manager<S, F>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView<F::Profile>>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    manager.switch_identity(&id).await?;
    Ok(Json(session_view(&manager).await))
}

async fn get_session<S, F>(State(manager): State<Manager<S, F>>) -> Json<SessionView<F::Profile>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    Json(session_view(&manager).await)
}

async fn login<S, F>(
    State(manager): State<Manager<S, F>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionView<F::Profile>>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    manager.login(req.token.expose()).await?;
    Ok(Json(session_view(&manager).await))
}

async fn logout<S, F>(
    State(manager): State<Manager<S, F>>,
) -> ApiResult<Json<SessionView<F::Profile>>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    manager.logout().await?;
    Ok(Json(session_view(&manager).await))
}

async fn refresh<S, F>(
    State(manager): State<Manager<S, F>>,
) -> ApiResult<Json<SessionView<F::Profile>>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    manager.refresh_active_profile().await?;
    Ok(Json(session_view(&manager).await))
}

async fn set_runtime<S, F>(
    State(manager): State<Manager<S, F>>,
    Json(req): Json<AgentRuntimeRequest>,
) -> ApiResult<Json<SessionView<F::Profile>>>
where
    S: KeyValueStore,
    F: ProfileFetcher,
{
    manager.set_agent_runtime(req.enabled).await?;
    Ok(Json(session_view(&manager).await))
}

/// Register a new agent, save its key and make it the active identity.
async fn register<S, F>(
    State(manager): State<Manager<S, F>>,
    Json(mut req): Json<RegistrationRequest>,
) -> ApiResult<Response>
where
    S: KeyValueStore,
    F: ProfileFetcher + AgentRegistrar,
{
    req.name = req.name.trim().to_string();
    if req.name.is_empty() {
        return Err(ApiFailure::bad_request("agent name must not be empty"));
    }

    let registration = manager.fetcher().register(&req).await?;
    let identity = manager
        .add_identity(registration.api_key.expose(), Some(&req.name))
        .await?;
    manager.switch_identity(&identity.id).await?;

    let identity = manager.identity(&identity.id).await.unwrap_or(identity);
    let body = RegisterResponse {
        identity: IdentityView::new(&identity, Some(identity.id.as_str())),
        api_key: registration.api_key,
        claim_url: registration.claim_url,
        verification_code: registration.verification_code,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Server-sent stream of session events.
async fn events<S, F>(
    State(manager): State<Manager<S, F>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: KeyValueStore + 'static,
    F: ProfileFetcher + 'static,
{
    let stream = manager.events().stream().filter_map(|event| async move {
        match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::error!("Failed to serialize event: {e}");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, header},
    };
    use claw_master_core::{Platform, ProfileOutcome};
    use claw_master_platforms::{ApiError, ApiErrorKind, MoltbookProfile, Registration};
    use claw_master_session::storage::MemoryStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    struct FakePlatform {
        tokens: Mutex<HashMap<String, ProfileOutcome<MoltbookProfile>>>,
    }

    fn claimed(name: &str) -> ProfileOutcome<MoltbookProfile> {
        ProfileOutcome::Profile(MoltbookProfile {
            name: name.to_string(),
            description: None,
            karma: 5,
            is_claimed: true,
            claim_url: None,
            follower_count: 0,
            following_count: 0,
        })
    }

    #[async_trait]
    impl ProfileFetcher for FakePlatform {
        type Profile = MoltbookProfile;

        fn platform(&self) -> Platform {
            Platform::Moltbook
        }

        async fn fetch_profile(&self, token: &str) -> ProfileOutcome<MoltbookProfile> {
            self.tokens
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .unwrap_or_else(|| ProfileOutcome::Unauthorized("Invalid API key".to_string()))
        }
    }

    #[async_trait]
    impl AgentRegistrar for FakePlatform {
        async fn register(&self, request: &RegistrationRequest) -> Result<Registration, ApiError> {
            if request.name == "taken" {
                return Err(ApiError {
                    kind: ApiErrorKind::Http,
                    status: Some(409),
                    message: "Name already taken".to_string(),
                    hint: Some("Try another name".to_string()),
                });
            }
            let api_key = format!("moltbook_sk_{}", request.name);
            self.tokens.lock().unwrap().insert(
                api_key.clone(),
                ProfileOutcome::Unclaimed {
                    claim_url: Some("https://www.moltbook.com/claim/new".to_string()),
                },
            );
            Ok(Registration {
                api_key: api_key.into(),
                claim_url: Some("https://www.moltbook.com/claim/new".to_string()),
                verification_code: Some("reef-1234".to_string()),
            })
        }
    }

    async fn app() -> Router {
        let fake = FakePlatform {
            tokens: Mutex::new(HashMap::from([
                ("tok-a".to_string(), claimed("alpha")),
                ("tok-b".to_string(), claimed("beta")),
            ])),
        };
        let manager = AgentSessionManager::load(Arc::new(MemoryStore::new()), fake)
            .await
            .unwrap();
        platform_router(Arc::new(manager))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_add_switch_and_list() {
        let app = app().await;

        let (status, added) = send(
            &app,
            Method::POST,
            "/identities",
            Some(json!({ "token": "tok-a" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(added["displayName"], "alpha");
        assert_eq!(added["maskedToken"], "****ok-a");
        assert_eq!(added["active"], false);

        let id = added["id"].as_str().unwrap().to_string();
        let (status, session) =
            send(&app, Method::POST, &format!("/identities/{id}/switch"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["state"]["status"], "logged_in");
        assert_eq!(session["activeIdentityId"], id.as_str());
        assert_eq!(session["profile"]["name"], "alpha");
        assert!(!session.to_string().contains("\"tok-a\""));

        let (_, list) = send(&app, Method::GET, "/identities", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["active"], true);
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/identities",
            Some(json!({ "token": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("Invalid API key"));

        let (_, list) = send(&app, Method::GET, "/identities", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_unknown_identity_routes() {
        let app = app().await;

        let (status, _) = send(&app, Method::POST, "/identities/missing/switch", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/identities/missing",
            Some(json!({ "displayName": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/identities/missing", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_login_logout_and_runtime() {
        let app = app().await;

        let (status, _) = send(
            &app,
            Method::PUT,
            "/session/runtime",
            Some(json!({ "enabled": true })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, session) = send(
            &app,
            Method::POST,
            "/session/login",
            Some(json!({ "token": "tok-b" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["state"]["claimed"], true);
        assert_eq!(session["activeIdentityId"], Value::Null);

        let (_, session) = send(
            &app,
            Method::PUT,
            "/session/runtime",
            Some(json!({ "enabled": true })),
        )
        .await;
        assert_eq!(session["agentRuntimeEnabled"], true);

        let (_, session) = send(&app, Method::POST, "/session/logout", None).await;
        assert_eq!(session["state"]["status"], "logged_out");
        assert_eq!(session["maskedToken"], Value::Null);
        assert_eq!(session["agentRuntimeEnabled"], false);
    }

    #[tokio::test]
    async fn test_register_activates_new_agent() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/register",
            Some(json!({ "name": " newbie ", "description": "fresh" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["apiKey"], "moltbook_sk_newbie");
        assert_eq!(body["verificationCode"], "reef-1234");
        assert_eq!(body["identity"]["displayName"], "newbie");
        assert_eq!(body["identity"]["active"], true);

        let (_, session) = send(&app, Method::GET, "/session", None).await;
        assert_eq!(session["state"]["claimed"], false);
        assert_eq!(session["profile"]["name"], "newbie");
        assert_eq!(
            session["profile"]["claim_url"],
            "https://www.moltbook.com/claim/new"
        );
    }

    #[tokio::test]
    async fn test_register_errors() {
        let app = app().await;

        let (status, _) = send(&app, Method::POST, "/register", Some(json!({ "name": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&app, Method::POST, "/register", Some(json!({ "name": "taken" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["hint"], "Try another name");

        let (_, list) = send(&app, Method::GET, "/identities", None).await;
        assert_eq!(list, json!([]));
    }
}
