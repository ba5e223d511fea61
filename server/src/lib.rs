//! # Arena Pong Lobby Server
//!
//! This library provides the authoritative server for arena Pong: up to four
//! players per lobby, each guarding one edge of a square playfield. It admits
//! players into lobbies, binds their real-time channels, runs each lobby's
//! game on a fixed tick and broadcasts full state snapshots.
//!
//! ## Core Responsibilities
//!
//! ### Lobby Admission
//! Lobbies are created and joined over plain HTTP. A lobby is identified by a
//! short code that players can type; players are identified by an opaque id
//! handed out on create or join. Side assignment follows join order.
//!
//! ### Authoritative Simulation
//! The server owns the ball, the paddles and the scores. Clients only send
//! intents (ready, move, leave) and render whatever state they are sent.
//!
//! ### State Broadcasting
//! Every change is followed by a full snapshot pushed to every channel attached
//! to the lobby. There are no deltas and no acknowledgements.
//!
//! ## Architecture Design
//!
//! ### Single Dispatcher
//! One task owns the lobby registry and consumes events from a queue: admission
//! commands, channel attach/detach, inbound messages and ticks. Each event runs
//! to completion before the next one, so lobby state needs no locking.
//!
//! ### Per-Lobby Clock
//! A lobby that is PLAYING owns a tick handle. The task behind it posts tick
//! events to the dispatcher; dropping the handle stops it. Ticks that arrive
//! after a game ended find the lobby in another state and do nothing.
//!
//! ### WebSocket Channels
//! Each channel is split into a reader loop posting inbound messages and a
//! writer task draining an outbound queue. Closing a channel, for whatever
//! reason, removes its player from the lobby.
//!
//! ## Module Organization
//!
//! - `physics`: playfield geometry, collisions, serves and scoring walls
//! - `lobby` / `game`: the lobby entity and its WAITING -> PLAYING -> GAME_OVER machine
//! - `lobby_manager` / `session`: the registry and channel binding
//! - `broadcast`: fan-out of serialized messages
//! - `tick`: the per-lobby clock
//! - `network` / `http`: dispatcher, socket tasks and admission routes
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::serve;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(config.address()).await?;
//!
//!     // Serves /lobby/*, /health and /ws until the process is stopped
//!     serve(listener, config).await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod game;
pub mod http;
pub mod lobby;
pub mod lobby_manager;
pub mod network;
pub mod physics;
pub mod session;
pub mod tick;
pub mod utils;
