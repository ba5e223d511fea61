use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub const FIELD_SIZE: f32 = 600.0;
pub const BALL_SIZE: f32 = 10.0;
pub const PADDLE_LENGTH: f32 = 100.0;
pub const PADDLE_THICKNESS: f32 = 10.0;
/// Gap between a paddle and the edge it guards.
pub const PADDLE_MARGIN: f32 = 10.0;
pub const PADDLE_STEP: f32 = 10.0;
pub const SERVE_SPEED: f32 = 3.0;
pub const SPEEDUP: f32 = 1.05;
pub const WINNING_SCORE: u32 = 10;
pub const MAX_PLAYERS: usize = 4;
pub const DEFAULT_TICK_RATE: u32 = 60;

pub type PlayerId = String;
pub type LobbyCode = String;

/// Playfield edge guarded by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Seat order: the host takes the first side, each joiner the next one.
    pub const ROTATION: [Side; MAX_PLAYERS] = [Side::Bottom, Side::Top, Side::Left, Side::Right];

    /// Side for the player occupying `seat` (0 = host), if the lobby has room for it.
    pub fn for_seat(seat: usize) -> Option<Side> {
        Self::ROTATION.get(seat).copied()
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// True for TOP and BOTTOM, whose paddles slide along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "UP", alias = "up")]
    Up,
    #[serde(rename = "DOWN", alias = "down")]
    Down,
    #[serde(rename = "LEFT", alias = "left")]
    Left,
    #[serde(rename = "RIGHT", alias = "right")]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Waiting,
    Playing,
    GameOver,
}

/// Ball position (top-left corner of its box) and per-tick velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    /// A motionless ball at the center of the playfield.
    pub fn centered() -> Self {
        Self {
            x: FIELD_SIZE / 2.0,
            y: FIELD_SIZE / 2.0,
            vx: 0.0,
            vy: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paddle {
    pub player_id: PlayerId,
    pub side: Side,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub side: Side,
    pub ready: bool,
    pub is_host: bool,
}

/// Full game state as carried by `GAME_STATE_UPDATE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub status: GameStatus,
    pub ball: Ball,
    pub paddles: Vec<Paddle>,
    pub scores: HashMap<PlayerId, u32>,
    pub players: Vec<PlayerView>,
    pub host_id: Option<PlayerId>,
}

/// Messages a player sends over the real-time channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    PlayerReady,
    MovePaddle { direction: Direction },
    LeaveLobby,
}

#[derive(Debug, Deserialize)]
struct MovePaddlePayload {
    direction: Direction,
}

/// Messages the server pushes to every channel attached to a lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    GameStateUpdate(GameSnapshot),
    PlayerJoined {
        #[serde(rename = "playerName")]
        player_name: String,
    },
    PlayerLeft {
        #[serde(rename = "playerName")]
        player_name: String,
    },
    GameStart {
        #[serde(rename = "startTime")]
        start_time: u64,
    },
    GameOver { winner: String },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

/// Decodes one inbound text frame.
///
/// Payload-less messages are accepted with the `payload` field absent or null.
/// Anything that is not a JSON object with a string `type` is `Malformed`; a
/// well-formed message with an unrecognised tag is `UnknownType`.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Malformed("missing `type` field".to_string()))?;

    match tag {
        "PLAYER_READY" => Ok(ClientMessage::PlayerReady),
        "LEAVE_LOBBY" => Ok(ClientMessage::LeaveLobby),
        "MOVE_PADDLE" => {
            let payload = value.get("payload").cloned().unwrap_or(Value::Null);
            let MovePaddlePayload { direction } = serde_json::from_value(payload)?;
            Ok(ClientMessage::MovePaddle { direction })
        }
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}

// Admission API bodies. Missing strings default to empty so the handlers can
// answer with InvalidInput instead of a body rejection.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLobbyRequest {
    pub host_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyResponse {
    pub lobby_code: LobbyCode,
    pub host_id: PlayerId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinLobbyRequest {
    pub lobby_code: LobbyCode,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyResponse {
    pub player_id: PlayerId,
    pub lobby_code: LobbyCode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub lobby_code: Option<LobbyCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStatusResponse {
    pub lobby_code: LobbyCode,
    pub players: Vec<String>,
}

/// Query parameters of the real-time channel upgrade request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub lobby_code: Option<LobbyCode>,
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
