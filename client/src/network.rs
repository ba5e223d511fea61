//! Client side of the admission API and the real-time channel.

use crate::error::ClientError;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use reqwest::{Response, Url};
use shared::{
    ClientMessage, CreateLobbyRequest, CreateLobbyResponse, ErrorResponse, JoinLobbyRequest,
    JoinLobbyResponse, LobbyCode, LobbyStatusResponse, PlayerId, ServerMessage,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// What a player needs to open their channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub lobby_code: LobbyCode,
    pub player_id: PlayerId,
}

pub struct LobbyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LobbyClient {
    /// `server` is either `host:port` or a full `http://` URL.
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let raw = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };
        let base_url =
            Url::parse(&raw).map_err(|e| ClientError::InvalidAddress(format!("{}: {}", server, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidAddress(e.to_string()))
    }

    /// Turns an error status into `Rejected`, reading the `{error}` body when present.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn create(&self, host_name: &str) -> Result<Credentials, ClientError> {
        let request = CreateLobbyRequest {
            host_name: host_name.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint("/lobby/create")?)
            .json(&request)
            .send()
            .await?;
        let created: CreateLobbyResponse = Self::check(response).await?.json().await?;
        info!("Created lobby {}", created.lobby_code);

        Ok(Credentials {
            lobby_code: created.lobby_code,
            player_id: created.host_id,
        })
    }

    pub async fn join(&self, lobby_code: &str, player_name: &str) -> Result<Credentials, ClientError> {
        let request = JoinLobbyRequest {
            lobby_code: lobby_code.to_string(),
            player_name: player_name.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint("/lobby/join")?)
            .json(&request)
            .send()
            .await?;
        let joined: JoinLobbyResponse = Self::check(response).await?.json().await?;
        info!("Joined lobby {} as {}", joined.lobby_code, joined.player_id);

        Ok(Credentials {
            lobby_code: joined.lobby_code,
            player_id: joined.player_id,
        })
    }

    pub async fn status(&self, lobby_code: &str) -> Result<LobbyStatusResponse, ClientError> {
        let response = self
            .http
            .get(self.endpoint("/lobby/status")?)
            .query(&[("lobbyCode", lobby_code)])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// URL of the real-time channel for `credentials`.
    pub fn channel_url(&self, credentials: &Credentials) -> Result<Url, ClientError> {
        let mut url = self.endpoint("/ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::InvalidAddress(self.base_url.to_string()))?;
        url.query_pairs_mut()
            .append_pair("lobbyCode", &credentials.lobby_code)
            .append_pair("playerId", &credentials.player_id);
        Ok(url)
    }

    pub async fn connect(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let url = self.channel_url(credentials)?;
        let (stream, _) = connect_async(url.as_str()).await?;
        debug!("Channel open for {}", credentials.player_id);

        Ok(Session {
            stream,
            credentials: credentials.clone(),
            close_reason: None,
        })
    }
}

/// An open real-time channel.
pub struct Session {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub credentials: Credentials,
    close_reason: Option<String>,
}

impl Session {
    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(message)?;
        self.send_text(text).await
    }

    /// Sends a raw text frame, whatever it contains.
    pub async fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Waits for the next server message; `None` once the channel closed.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(serde_json::from_str(&text)?)),
                Some(Ok(Message::Close(frame))) => {
                    self.close_reason = frame.map(|f| f.reason.into_owned());
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed))
                | None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Reason carried by the server's close frame, if one was received.
    pub fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
