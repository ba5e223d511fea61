//! Admission API routes.
//!
//! Handlers are thin: they validate the body shape, post a command to the
//! dispatcher and translate its answer.

use crate::error::LobbyError;
use crate::network::{ws_handler, ServerHandle};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use shared::{
    CreateLobbyRequest, CreateLobbyResponse, JoinLobbyRequest, JoinLobbyResponse,
    LobbyStatusResponse, StatusQuery,
};
use tower_http::cors::CorsLayer;

pub fn router(server: ServerHandle) -> Router {
    Router::new()
        .route("/lobby/create", post(create_lobby))
        .route("/lobby/join", post(join_lobby))
        .route("/lobby/status", get(lobby_status))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(server)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, LobbyError> {
    payload
        .map(|Json(request)| request)
        .map_err(|_| LobbyError::InvalidInput("request body must be a JSON object"))
}

async fn create_lobby(
    State(server): State<ServerHandle>,
    payload: Result<Json<CreateLobbyRequest>, JsonRejection>,
) -> Result<Json<CreateLobbyResponse>, LobbyError> {
    let request = body(payload)?;
    server.create_lobby(request.host_name).await.map(Json)
}

async fn join_lobby(
    State(server): State<ServerHandle>,
    payload: Result<Json<JoinLobbyRequest>, JsonRejection>,
) -> Result<Json<JoinLobbyResponse>, LobbyError> {
    let request = body(payload)?;
    server
        .join_lobby(request.lobby_code, request.player_name)
        .await
        .map(Json)
}

async fn lobby_status(
    State(server): State<ServerHandle>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<LobbyStatusResponse>, LobbyError> {
    let lobby_code = query.lobby_code.unwrap_or_default();
    server.lobby_status(lobby_code).await.map(Json)
}

async fn health() -> &'static str {
    "ok"
}
