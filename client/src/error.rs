use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The admission API answered with an error body.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("undecodable server message: {0}")]
    Decode(#[from] serde_json::Error),
}
