//! # Arena Pong Client Library
//!
//! This library provides a headless client for the arena Pong lobby server. It
//! covers everything a player does short of drawing the field: lobby
//! admission, the real-time channel, and a local view of the game that can
//! steer a paddle on its own.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - `LobbyClient` creates, joins and queries lobbies over HTTP
//! - `Session` wraps the WebSocket channel, sending intents and decoding
//!   server messages
//!
//! ### Game Module (`game`)
//! - `LocalView` keeps the latest snapshot and the announced winner
//! - `steer()` picks the direction that moves our paddle toward the ball
//! - `next_move()` steers at most once per frame the server simulated
//!
//! ### Error Module (`error`)
//! - `ClientError` covers bad addresses, HTTP failures, server rejections,
//!   socket errors and undecodable frames
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::LocalView;
//! use client::network::LobbyClient;
//! use shared::ClientMessage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lobby = LobbyClient::new("127.0.0.1:8080")?;
//!     let credentials = lobby.create("Alice").await?;
//!
//!     let mut session = lobby.connect(&credentials).await?;
//!     let mut view = LocalView::new(credentials.player_id.clone());
//!     session.send(&ClientMessage::PlayerReady).await?;
//!
//!     while let Some(message) = session.next_message().await? {
//!         view.apply(&message);
//!         if let Some(direction) = view.next_move() {
//!             session.send(&ClientMessage::MovePaddle { direction }).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design Philosophy
//!
//! The server is authoritative. The client never predicts or simulates; it
//! renders (or, headless, reacts to) whatever snapshot arrived last.

pub mod error;
pub mod game;
pub mod network;
