//! Binding of real-time channels to lobby members.
//!
//! One channel per player. Reconnection is not supported: a channel that
//! closes takes its player out of the lobby.

use crate::broadcast::Connection;
use crate::error::LobbyError;
use crate::lobby_manager::LobbyManager;
use log::info;

impl LobbyManager {
    /// Records `connection` against a member and sends them a full snapshot.
    pub fn attach(&mut self, code: &str, player_id: &str, connection: Connection) -> Result<(), LobbyError> {
        let lobby = self
            .lobby_mut(code)
            .ok_or_else(|| LobbyError::NotFound(code.to_string()))?;
        if !lobby.contains(player_id) {
            return Err(LobbyError::NotMember(player_id.to_string()));
        }
        if lobby.connections.contains_key(player_id) {
            return Err(LobbyError::AlreadyConnected(player_id.to_string()));
        }

        lobby.connections.insert(player_id.to_string(), connection);
        info!("Player {} attached to lobby {}", player_id, code);
        lobby.send_state_to(player_id);
        Ok(())
    }

    /// Channel closure, for whatever reason, is a leave.
    pub fn detach(&mut self, code: &str, player_id: &str) {
        if self.leave(code, player_id) {
            info!("Player {} detached from lobby {}", player_id, code);
        }
    }
}
