//! Lobby entity: its roster, host, attached channels and game.

use crate::broadcast::{fan_out, Connection};
use crate::error::LobbyError;
use crate::game::GameState;
use crate::tick::TickHandle;
use log::info;
use shared::{
    GameSnapshot, GameStatus, LobbyCode, PlayerId, PlayerView, ServerMessage, Side, MAX_PLAYERS,
};
use std::collections::HashMap;

/// A member of a lobby.
///
/// Scores live in the lobby's `GameState`, keyed by the player's id.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub side: Side,
}

impl Player {
    pub fn new(id: PlayerId, name: String, side: Side) -> Self {
        Self {
            id,
            name,
            ready: false,
            side,
        }
    }
}

pub struct Lobby {
    pub code: LobbyCode,
    /// Join order; decides side assignment.
    pub players: Vec<Player>,
    /// Empty only while the lobby is being torn down.
    pub host: Option<PlayerId>,
    pub connections: HashMap<PlayerId, Connection>,
    pub game: GameState,
    /// Present exactly while a game is PLAYING.
    pub tick: Option<TickHandle>,
}

impl Lobby {
    /// Creates a lobby holding only its host, seated on the first side.
    pub fn new(code: LobbyCode, host_id: PlayerId, host_name: String) -> Self {
        let host = Player::new(host_id.clone(), host_name, Side::ROTATION[0]);
        let mut game = GameState::new();
        game.scores.insert(host_id.clone(), 0);

        Self {
            code,
            players: vec![host],
            host: Some(host_id),
            connections: HashMap::new(),
            game,
            tick: None,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    /// Seats a new player on the next side of the rotation and announces them.
    pub fn add_player(&mut self, player_id: PlayerId, name: String) -> Result<Side, LobbyError> {
        if self.is_full() {
            return Err(LobbyError::Full(self.code.clone()));
        }
        let side = Side::for_seat(self.players.len())
            .ok_or_else(|| LobbyError::Full(self.code.clone()))?;

        info!("Player {} ({}) joined lobby {} on {:?}", name, player_id, self.code, side);
        self.game.scores.insert(player_id.clone(), 0);
        self.players.push(Player::new(player_id, name.clone(), side));
        self.broadcast(&ServerMessage::PlayerJoined { player_name: name });

        Ok(side)
    }

    /// Drops a player from the roster and their channel.
    ///
    /// Outside of play their score entry goes too. During play it is kept so
    /// the final scoreboard still shows the points they made. Paddles are left
    /// alone. If the host left, the earliest remaining player
    /// takes over; an emptied lobby has no host.
    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == player_id)?;
        let player = self.players.remove(index);

        self.connections.remove(player_id);
        if self.game.status != GameStatus::Playing {
            self.game.scores.remove(player_id);
        }

        if self.host.as_deref() == Some(player_id) {
            self.host = self.players.first().map(|p| p.id.clone());
            if let Some(new_host) = &self.host {
                info!("Player {} is now host of lobby {}", new_host, self.code);
            }
        }

        Some(player)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let players = self
            .players
            .iter()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                side: p.side,
                ready: p.ready,
                is_host: self.host.as_deref() == Some(p.id.as_str()),
            })
            .collect();

        GameSnapshot {
            status: self.game.status,
            ball: self.game.ball,
            paddles: self.game.paddles.clone(),
            scores: self.game.scores.clone(),
            players,
            host_id: self.host.clone(),
        }
    }

    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        fan_out(self.connections.values(), message)
    }

    pub fn broadcast_state(&self) -> usize {
        self.broadcast(&ServerMessage::GameStateUpdate(self.snapshot()))
    }

    /// Sends the full snapshot to one player only.
    pub fn send_state_to(&self, player_id: &str) -> bool {
        self.connections
            .get(player_id)
            .map(|c| c.send(&ServerMessage::GameStateUpdate(self.snapshot())))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::OUTBOUND_QUEUE;
    use tokio::sync::mpsc;

    fn lobby_with_host() -> Lobby {
        Lobby::new("ABCDE".into(), "host".into(), "Alice".into())
    }

    #[test]
    fn test_new_lobby_seats_host() {
        let lobby = lobby_with_host();
        assert_eq!(lobby.players.len(), 1);
        assert_eq!(lobby.players[0].side, Side::Bottom);
        assert_eq!(lobby.host.as_deref(), Some("host"));
        assert_eq!(lobby.game.status, GameStatus::Waiting);
        assert_eq!(lobby.game.scores.get("host"), Some(&0));
        assert!(!lobby.is_ticking());
    }

    #[test]
    fn test_sides_follow_join_order() {
        let mut lobby = lobby_with_host();
        assert_eq!(lobby.add_player("b".into(), "Bob".into()), Ok(Side::Top));
        assert_eq!(lobby.add_player("c".into(), "Carol".into()), Ok(Side::Left));
        assert_eq!(lobby.add_player("d".into(), "Dave".into()), Ok(Side::Right));
        assert!(lobby.is_full());
        assert_eq!(
            lobby.add_player("e".into(), "Eve".into()),
            Err(LobbyError::Full("ABCDE".into()))
        );
        assert_eq!(lobby.player_names(), vec!["Alice", "Bob", "Carol", "Dave"]);
        assert_eq!(lobby.game.scores.len(), 4);
    }

    #[test]
    fn test_side_depends_on_count_at_join_time() {
        let mut lobby = lobby_with_host();
        lobby.add_player("b".into(), "Bob".into()).unwrap();
        lobby.add_player("c".into(), "Carol".into()).unwrap();
        lobby.remove_player("b");

        // Two players remain, so the next joiner takes the third side again.
        assert_eq!(lobby.add_player("d".into(), "Dave".into()), Ok(Side::Left));
    }

    #[test]
    fn test_join_is_announced() {
        let mut lobby = lobby_with_host();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
        lobby
            .connections
            .insert("host".into(), Connection::new("host".into(), tx));

        lobby.add_player("b".into(), "Bob".into()).unwrap();

        let message: ServerMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            message,
            ServerMessage::PlayerJoined {
                player_name: "Bob".into()
            }
        );
    }

    #[test]
    fn test_host_promotion_follows_lobby_order() {
        let mut lobby = lobby_with_host();
        lobby.add_player("b".into(), "Bob".into()).unwrap();
        lobby.add_player("c".into(), "Carol".into()).unwrap();

        let removed = lobby.remove_player("host").unwrap();
        assert_eq!(removed.name, "Alice");
        assert_eq!(lobby.host.as_deref(), Some("b"));
        assert!(!lobby.game.scores.contains_key("host"));

        lobby.remove_player("b");
        assert_eq!(lobby.host.as_deref(), Some("c"));

        lobby.remove_player("c");
        assert!(lobby.is_empty());
        assert_eq!(lobby.host, None);
    }

    #[test]
    fn test_removing_non_host_keeps_host() {
        let mut lobby = lobby_with_host();
        lobby.add_player("b".into(), "Bob".into()).unwrap();
        lobby.remove_player("b");
        assert_eq!(lobby.host.as_deref(), Some("host"));
    }

    #[test]
    fn test_remove_unknown_player_is_noop() {
        let mut lobby = lobby_with_host();
        assert!(lobby.remove_player("ghost").is_none());
        assert_eq!(lobby.players.len(), 1);
    }

    #[test]
    fn test_snapshot_marks_host_and_readiness() {
        let mut lobby = lobby_with_host();
        lobby.add_player("b".into(), "Bob".into()).unwrap();
        lobby.player_mut("b").unwrap().ready = true;

        let snapshot = lobby.snapshot();
        assert_eq!(snapshot.players.len(), 2);
        assert!(snapshot.players[0].is_host);
        assert!(!snapshot.players[1].is_host);
        assert!(snapshot.players[1].ready);
        assert_eq!(snapshot.host_id.as_deref(), Some("host"));
        assert_eq!(snapshot.scores.len(), 2);
    }

    #[test]
    fn test_send_state_to_single_player() {
        let mut lobby = lobby_with_host();
        lobby.add_player("b".into(), "Bob".into()).unwrap();
        let (tx_a, mut rx_a) = mpsc::channel(OUTBOUND_QUEUE);
        let (tx_b, mut rx_b) = mpsc::channel(OUTBOUND_QUEUE);
        lobby
            .connections
            .insert("host".into(), Connection::new("host".into(), tx_a));
        lobby
            .connections
            .insert("b".into(), Connection::new("b".into(), tx_b));

        assert!(lobby.send_state_to("b"));
        assert!(!lobby.send_state_to("ghost"));

        assert!(rx_b.try_recv().unwrap().contains("GAME_STATE_UPDATE"));
        assert!(rx_a.try_recv().is_err());
    }
}
