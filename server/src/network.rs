//! Server network layer: the dispatcher loop and the WebSocket channel tasks
//!
//! Every lobby mutation funnels through one `Dispatcher` that owns the
//! registry. HTTP handlers, socket readers and tick loops only post
//! `ServerEvent`s to it, so no lock ever guards lobby state.

use crate::broadcast::{Connection, OUTBOUND_QUEUE};
use crate::config::ServerConfig;
use crate::error::LobbyError;
use crate::http::router;
use crate::lobby_manager::LobbyManager;
use crate::tick::IntervalScheduler;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{
    decode_client_message, ClientMessage, ConnectParams, CreateLobbyResponse, JoinLobbyResponse,
    LobbyCode, LobbyStatusResponse, PlayerId,
};
use std::borrow::Cow;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

type Reply<T> = oneshot::Sender<Result<T, LobbyError>>;

/// Events consumed by the dispatcher
#[derive(Debug)]
pub enum ServerEvent {
    CreateLobby {
        host_name: String,
        reply: Reply<CreateLobbyResponse>,
    },
    JoinLobby {
        lobby_code: LobbyCode,
        player_name: String,
        reply: Reply<JoinLobbyResponse>,
    },
    LobbyStatus {
        lobby_code: LobbyCode,
        reply: Reply<LobbyStatusResponse>,
    },
    Attach {
        lobby_code: LobbyCode,
        player_id: PlayerId,
        sender: mpsc::Sender<String>,
        reply: Reply<()>,
    },
    Inbound {
        lobby_code: LobbyCode,
        player_id: PlayerId,
        message: ClientMessage,
    },
    Detach {
        lobby_code: LobbyCode,
        player_id: PlayerId,
    },
    Tick {
        lobby_code: LobbyCode,
    },
    Shutdown,
}

/// Owner of the lobby registry
pub struct Dispatcher {
    manager: LobbyManager,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Dispatcher {
    pub fn new(manager: LobbyManager, events: mpsc::UnboundedReceiver<ServerEvent>) -> Self {
        Self { manager, events }
    }

    /// Handles events one at a time until shutdown
    pub async fn run(mut self) {
        info!("Dispatcher started");

        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }

        info!("Dispatcher shutting down with {} live lobbies", self.manager.len());
    }

    /// Applies one event to the registry. Returns false on shutdown.
    fn handle_event(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::CreateLobby { host_name, reply } => {
                Self::respond(reply, self.manager.create_lobby(&host_name));
            }
            ServerEvent::JoinLobby {
                lobby_code,
                player_name,
                reply,
            } => {
                Self::respond(reply, self.manager.join_lobby(&lobby_code, &player_name));
            }
            ServerEvent::LobbyStatus { lobby_code, reply } => {
                Self::respond(reply, self.manager.status(&lobby_code));
            }
            ServerEvent::Attach {
                lobby_code,
                player_id,
                sender,
                reply,
            } => {
                let connection = Connection::new(player_id.clone(), sender);
                Self::respond(reply, self.manager.attach(&lobby_code, &player_id, connection));
            }
            ServerEvent::Inbound {
                lobby_code,
                player_id,
                message,
            } => {
                debug!("{} in lobby {}: {:?}", player_id, lobby_code, message);
                self.manager.handle_message(&lobby_code, &player_id, message);
            }
            ServerEvent::Detach {
                lobby_code,
                player_id,
            } => {
                self.manager.detach(&lobby_code, &player_id);
            }
            ServerEvent::Tick { lobby_code } => {
                self.manager.tick(&lobby_code);
            }
            ServerEvent::Shutdown => return false,
        }
        true
    }

    fn respond<T>(reply: Reply<T>, result: Result<T, LobbyError>) {
        if reply.send(result).is_err() {
            debug!("Requester went away before its reply");
        }
    }
}

/// Cloneable front door to the dispatcher, shared by every request handler
#[derive(Debug, Clone)]
pub struct ServerHandle {
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl ServerHandle {
    pub fn new(events: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { events }
    }

    /// Posts an event without waiting. Returns false once the dispatcher is gone.
    pub fn post(&self, event: ServerEvent) -> bool {
        self.events.send(event).is_ok()
    }

    async fn request<T>(&self, event: impl FnOnce(Reply<T>) -> ServerEvent) -> Result<T, LobbyError> {
        let (reply, response) = oneshot::channel();
        if !self.post(event(reply)) {
            return Err(LobbyError::Unavailable);
        }
        response.await.map_err(|_| LobbyError::Unavailable)?
    }

    pub async fn create_lobby(&self, host_name: String) -> Result<CreateLobbyResponse, LobbyError> {
        self.request(|reply| ServerEvent::CreateLobby { host_name, reply })
            .await
    }

    pub async fn join_lobby(
        &self,
        lobby_code: LobbyCode,
        player_name: String,
    ) -> Result<JoinLobbyResponse, LobbyError> {
        self.request(|reply| ServerEvent::JoinLobby {
            lobby_code,
            player_name,
            reply,
        })
        .await
    }

    pub async fn lobby_status(&self, lobby_code: LobbyCode) -> Result<LobbyStatusResponse, LobbyError> {
        self.request(|reply| ServerEvent::LobbyStatus { lobby_code, reply })
            .await
    }

    pub async fn attach(
        &self,
        lobby_code: LobbyCode,
        player_id: PlayerId,
        sender: mpsc::Sender<String>,
    ) -> Result<(), LobbyError> {
        self.request(|reply| ServerEvent::Attach {
            lobby_code,
            player_id,
            sender,
            reply,
        })
        .await
    }

    pub fn shutdown(&self) {
        self.post(ServerEvent::Shutdown);
    }
}

/// Upgrades `/ws` requests. Admission is checked after the upgrade so a
/// refused channel gets a close frame with the reason.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(server): State<ServerHandle>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, params, server))
}

async fn handle_socket(socket: WebSocket, params: ConnectParams, server: ServerHandle) {
    let (lobby_code, player_id) = match (params.lobby_code, params.player_id) {
        (Some(code), Some(id)) if !code.is_empty() && !id.is_empty() => (code, id),
        _ => {
            warn!("Rejecting channel without lobbyCode and playerId");
            reject(socket, "lobbyCode and playerId are required".to_string()).await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    if let Err(e) = server.attach(lobby_code.clone(), player_id.clone(), tx).await {
        warn!("Rejecting channel of {} for lobby {}: {}", player_id, lobby_code, e);
        reject(socket, e.to_string()).await;
        return;
    }

    let (mut sink, mut stream) = socket.split();

    // The lobby holds the only sender; once it drops the connection entry the
    // queue drains and the socket is closed from our side.
    let mut writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!("Socket write failed: {}", e);
                return;
            }
        }
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: Cow::Borrowed("left lobby"),
            })))
            .await;
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_client_message(&text) {
                    Ok(message) => {
                        let event = ServerEvent::Inbound {
                            lobby_code: lobby_code.clone(),
                            player_id: player_id.clone(),
                            message,
                        };
                        if !server.post(event) {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping message from {} in lobby {}: {}", player_id, lobby_code, e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Socket read failed for {}: {}", player_id, e);
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    server.post(ServerEvent::Detach {
        lobby_code,
        player_id,
    });
    writer.abort();
}

async fn reject(mut socket: WebSocket, reason: String) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Cow::Owned(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to send close frame: {}", e);
    }
}

/// Runs the whole server on an already bound listener
///
/// Spawns the dispatcher, then serves HTTP and WebSocket traffic until the
/// listener fails or the future is dropped.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> std::io::Result<()> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let scheduler = IntervalScheduler::new(config.tick_period(), events_tx.clone());
    let dispatcher = Dispatcher::new(LobbyManager::new(Box::new(scheduler)), events_rx);
    tokio::spawn(dispatcher.run());

    let server = ServerHandle::new(events_tx);
    info!(
        "Lobby server listening on {} at {} ticks per second",
        listener.local_addr()?,
        config.tick_rate
    );

    let result = axum::serve(listener, router(server.clone())).await;
    if let Err(e) = &result {
        error!("Server stopped: {}", e);
    }
    server.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby_manager::tests::manager;
    use shared::ServerMessage;

    fn spawn_dispatcher() -> ServerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Dispatcher::new(manager(), rx).run());
        ServerHandle::new(tx)
    }

    #[tokio::test]
    async fn test_requests_round_trip_through_dispatcher() {
        let server = spawn_dispatcher();

        let created = server.create_lobby("Alice".into()).await.unwrap();
        let joined = server
            .join_lobby(created.lobby_code.clone(), "Bob".into())
            .await
            .unwrap();
        assert_eq!(joined.lobby_code, created.lobby_code);

        let status = server.lobby_status(created.lobby_code.clone()).await.unwrap();
        assert_eq!(status.players, vec!["Alice", "Bob"]);

        let err = server.lobby_status("NOPE1".into()).await.unwrap_err();
        assert_eq!(err, LobbyError::NotFound("NOPE1".into()));
    }

    #[tokio::test]
    async fn test_attach_and_inbound_events() {
        let server = spawn_dispatcher();
        let created = server.create_lobby("Alice".into()).await.unwrap();
        let bob = server
            .join_lobby(created.lobby_code.clone(), "Bob".into())
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
        server
            .attach(created.lobby_code.clone(), created.host_id.clone(), tx)
            .await
            .unwrap();
        let first: ServerMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert!(matches!(first, ServerMessage::GameStateUpdate(_)));

        server.post(ServerEvent::Inbound {
            lobby_code: created.lobby_code.clone(),
            player_id: bob.player_id.clone(),
            message: ClientMessage::PlayerReady,
        });
        let update: ServerMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        match update {
            ServerMessage::GameStateUpdate(snapshot) => assert!(snapshot.players[1].ready),
            other => panic!("Unexpected message: {:?}", other),
        }

        server.post(ServerEvent::Detach {
            lobby_code: created.lobby_code.clone(),
            player_id: bob.player_id.clone(),
        });
        let left: ServerMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            left,
            ServerMessage::PlayerLeft {
                player_name: "Bob".into()
            }
        );
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_are_unavailable() {
        let server = spawn_dispatcher();
        server.shutdown();

        let err = server.create_lobby("Alice".into()).await.unwrap_err();
        assert_eq!(err, LobbyError::Unavailable);
    }
}
