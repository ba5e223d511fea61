//! Errors surfaced to admission callers and channel attach attempts.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::{ErrorResponse, LobbyCode, PlayerId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("lobby {0} not found")]
    NotFound(LobbyCode),
    #[error("lobby {0} is full")]
    Full(LobbyCode),
    #[error("player {0} is not a member of this lobby")]
    NotMember(PlayerId),
    #[error("player {0} already has an open channel")]
    AlreadyConnected(PlayerId),
    #[error("server is shutting down")]
    Unavailable,
}

impl LobbyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LobbyError::InvalidInput(_) | LobbyError::Full(_) => StatusCode::BAD_REQUEST,
            LobbyError::NotFound(_) | LobbyError::NotMember(_) => StatusCode::NOT_FOUND,
            LobbyError::AlreadyConnected(_) => StatusCode::CONFLICT,
            LobbyError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LobbyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
