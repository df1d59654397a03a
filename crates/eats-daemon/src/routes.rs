//! Axum router and HTTP handlers for eats-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are `pub(crate)`.

use std::sync::Arc;

use async_graphql::{
    http::{playground_source, GraphQLPlaygroundConfig, ALL_WEBSOCKET_PROTOCOLS},
    Data,
};
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use eats_service::Services;

use crate::{
    api_types::HealthResponse,
    graphql::{Viewer, JWT_HEADER},
    state::AppState,
};

pub const GRAPHQL_PATH: &str = "/graphql";
pub const GRAPHQL_WS_PATH: &str = "/graphql/ws";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route(GRAPHQL_PATH, get(playground).post(graphql_handler))
        .route(GRAPHQL_WS_PATH, get(graphql_ws))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /graphql  (playground)
// ---------------------------------------------------------------------------

pub(crate) async fn playground() -> impl IntoResponse {
    Html(playground_source(
        GraphQLPlaygroundConfig::new(GRAPHQL_PATH).subscription_endpoint(GRAPHQL_WS_PATH),
    ))
}

// ---------------------------------------------------------------------------
// POST /graphql
// ---------------------------------------------------------------------------

pub(crate) async fn graphql_handler(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let token = headers.get(JWT_HEADER).and_then(|v| v.to_str().ok());
    let viewer = resolve_viewer(&st.services, token).await;
    st.schema.execute(req.into_inner().data(viewer)).await.into()
}

// ---------------------------------------------------------------------------
// GET /graphql/ws  (subscriptions)
// ---------------------------------------------------------------------------

/// The token travels in the `connection_init` payload, since browsers cannot
/// set headers on a websocket upgrade.
pub(crate) async fn graphql_ws(
    State(st): State<Arc<AppState>>,
    protocol: GraphQLProtocol,
    ws: WebSocketUpgrade,
) -> Response {
    ws.protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |socket| {
            let services = st.services.clone();
            GraphQLWebSocket::new(socket, st.schema.clone(), protocol)
                .on_connection_init(move |payload| async move {
                    let token = payload.get(JWT_HEADER).and_then(|v| v.as_str());
                    let viewer = resolve_viewer(&services, token).await;
                    let mut data = Data::default();
                    data.insert(viewer);
                    Ok(data)
                })
                .serve()
        })
}

/// A missing or invalid token yields an anonymous viewer; guarded fields
/// reject it.
async fn resolve_viewer(services: &Services, token: Option<&str>) -> Viewer {
    match token {
        Some(t) => Viewer(services.users.authenticate(t).await),
        None => Viewer(None),
    }
}
