//! Process-wide lobby registry
//!
//! The registry owns every live lobby, the random source used for codes,
//! player ids and serves, and the scheduler that drives running games. It is
//! owned by the dispatcher task alone, so every operation here runs to
//! completion without interleaving with any other lobby mutation.
//!
//! Lookups by code or player id tolerate absence: an operation that names a
//! lobby or player that is already gone is a silent no-op.

use crate::error::LobbyError;
use crate::lobby::Lobby;
use crate::tick::TickScheduler;
use crate::utils::{random_code, random_player_id};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    ClientMessage, CreateLobbyResponse, Direction, JoinLobbyResponse, LobbyCode,
    LobbyStatusResponse,
};
use std::collections::HashMap;

pub struct LobbyManager {
    /// Live lobbies indexed by their code
    lobbies: HashMap<LobbyCode, Lobby>,
    /// Source for codes, player ids and serve directions
    rng: StdRng,
    /// Starts the clock of a lobby whose game begins
    scheduler: Box<dyn TickScheduler>,
}

impl LobbyManager {
    pub fn new(scheduler: Box<dyn TickScheduler>) -> Self {
        Self::with_rng(scheduler, StdRng::from_entropy())
    }

    /// Creates a registry with a caller-provided random source
    ///
    /// Seeding makes codes, ids and serves reproducible in tests.
    pub fn with_rng(scheduler: Box<dyn TickScheduler>, rng: StdRng) -> Self {
        Self {
            lobbies: HashMap::new(),
            rng,
            scheduler,
        }
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn lobby(&self, code: &str) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    pub(crate) fn lobby_mut(&mut self, code: &str) -> Option<&mut Lobby> {
        self.lobbies.get_mut(code)
    }

    /// Opens a new lobby with `host_name` as its only player
    ///
    /// Codes come from a small alphabet, so a freshly drawn code is checked
    /// against the live lobbies and redrawn until it is unused.
    pub fn create_lobby(&mut self, host_name: &str) -> Result<CreateLobbyResponse, LobbyError> {
        let host_name = host_name.trim();
        if host_name.is_empty() {
            return Err(LobbyError::InvalidInput("hostName is required"));
        }

        let mut code = random_code(&mut self.rng);
        while self.lobbies.contains_key(&code) {
            debug!("Lobby code {} already in use, drawing another", code);
            code = random_code(&mut self.rng);
        }
        let host_id = random_player_id(&mut self.rng);

        let lobby = Lobby::new(code.clone(), host_id.clone(), host_name.to_string());
        self.lobbies.insert(code.clone(), lobby);
        info!("Lobby {} created by {} ({})", code, host_name, host_id);

        Ok(CreateLobbyResponse {
            lobby_code: code,
            host_id,
        })
    }

    /// Admits a player into an existing lobby
    ///
    /// Missing fields are reported before the lobby is looked up; joining is
    /// allowed whatever the game status is.
    pub fn join_lobby(&mut self, code: &str, player_name: &str) -> Result<JoinLobbyResponse, LobbyError> {
        let code = code.trim();
        let player_name = player_name.trim();
        if code.is_empty() {
            return Err(LobbyError::InvalidInput("lobbyCode is required"));
        }
        if player_name.is_empty() {
            return Err(LobbyError::InvalidInput("playerName is required"));
        }

        let lobby = self
            .lobbies
            .get_mut(code)
            .ok_or_else(|| LobbyError::NotFound(code.to_string()))?;
        if lobby.is_full() {
            return Err(LobbyError::Full(code.to_string()));
        }

        let player_id = random_player_id(&mut self.rng);
        lobby.add_player(player_id.clone(), player_name.to_string())?;

        Ok(JoinLobbyResponse {
            player_id,
            lobby_code: lobby.code.clone(),
        })
    }

    /// Display names of the lobby's players in join order
    pub fn status(&self, code: &str) -> Result<LobbyStatusResponse, LobbyError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LobbyError::InvalidInput("lobbyCode is required"));
        }
        let lobby = self
            .lobbies
            .get(code)
            .ok_or_else(|| LobbyError::NotFound(code.to_string()))?;

        Ok(LobbyStatusResponse {
            lobby_code: lobby.code.clone(),
            players: lobby.player_names(),
        })
    }

    /// Removes a lobby. Dropping it stops its clock and closes its channels.
    ///
    /// Returns false if no such lobby was live.
    pub fn destroy(&mut self, code: &str) -> bool {
        match self.lobbies.remove(code) {
            Some(lobby) => {
                info!(
                    "Lobby {} destroyed ({} channels closed)",
                    code,
                    lobby.connections.len()
                );
                true
            }
            None => false,
        }
    }

    pub fn mark_ready(&mut self, code: &str, player_id: &str) {
        if let Some(lobby) = self.lobbies.get_mut(code) {
            lobby.mark_ready(player_id, &mut self.rng, &*self.scheduler);
        }
    }

    pub fn move_paddle(&mut self, code: &str, player_id: &str, direction: Direction) {
        if let Some(lobby) = self.lobbies.get_mut(code) {
            lobby.move_paddle(player_id, direction);
        }
    }

    /// Runs the leave procedure and destroys the lobby once it is empty
    ///
    /// Returns true if the player was a member.
    pub fn leave(&mut self, code: &str, player_id: &str) -> bool {
        let Some(lobby) = self.lobbies.get_mut(code) else {
            return false;
        };
        let left = lobby.leave(player_id).is_some();
        if lobby.is_empty() {
            self.destroy(code);
        }
        left
    }

    pub fn tick(&mut self, code: &str) {
        if let Some(lobby) = self.lobbies.get_mut(code) {
            lobby.tick(&mut self.rng);
        }
    }

    /// Routes one decoded inbound message to the state machine.
    pub fn handle_message(&mut self, code: &str, player_id: &str, message: ClientMessage) {
        match message {
            ClientMessage::PlayerReady => self.mark_ready(code, player_id),
            ClientMessage::MovePaddle { direction } => self.move_paddle(code, player_id, direction),
            ClientMessage::LeaveLobby => {
                self.leave(code, player_id);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tick::TickHandle;
    use shared::{GameStatus, Side, MAX_PLAYERS};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scheduler that only counts how often a clock was started.
    #[derive(Clone, Default)]
    pub(crate) struct CountingScheduler {
        pub started: Arc<AtomicUsize>,
    }

    impl TickScheduler for CountingScheduler {
        fn start(&self, _lobby_code: &str) -> TickHandle {
            self.started.fetch_add(1, Ordering::SeqCst);
            TickHandle::detached()
        }
    }

    pub(crate) fn manager() -> LobbyManager {
        LobbyManager::with_rng(Box::new(CountingScheduler::default()), StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_create_lobby() {
        let mut manager = manager();
        let created = manager.create_lobby("  Alice ").unwrap();

        assert_eq!(created.lobby_code.len(), 5);
        assert!(!created.host_id.is_empty());
        let lobby = manager.lobby(&created.lobby_code).unwrap();
        assert_eq!(lobby.player_names(), vec!["Alice"]);
        assert_eq!(lobby.host.as_deref(), Some(created.host_id.as_str()));
        assert_eq!(lobby.game.status, GameStatus::Waiting);
    }

    #[test]
    fn test_create_requires_name() {
        let mut manager = manager();
        assert!(matches!(manager.create_lobby(""), Err(LobbyError::InvalidInput(_))));
        assert!(matches!(manager.create_lobby("   "), Err(LobbyError::InvalidInput(_))));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_codes_are_unique_under_collision() {
        // Same seed: the second registry draws exactly the codes the first did.
        let mut first = manager();
        let taken = first.create_lobby("Alice").unwrap().lobby_code;

        let mut second = manager();
        second.lobbies.insert(
            taken.clone(),
            Lobby::new(taken.clone(), "someone".into(), "Someone".into()),
        );
        let created = second.create_lobby("Alice").unwrap();

        assert_ne!(created.lobby_code, taken);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_many_lobbies_have_distinct_codes() {
        let mut manager = manager();
        for i in 0..200 {
            manager.create_lobby(&format!("host{}", i)).unwrap();
        }
        assert_eq!(manager.len(), 200);
    }

    #[test]
    fn test_join_lobby() {
        let mut manager = manager();
        let code = manager.create_lobby("Alice").unwrap().lobby_code;

        let joined = manager.join_lobby(&code, "Bob").unwrap();
        assert_eq!(joined.lobby_code, code);

        let lobby = manager.lobby(&code).unwrap();
        assert_eq!(lobby.player(&joined.player_id).unwrap().side, Side::Top);
        assert_eq!(lobby.game.scores.get(&joined.player_id), Some(&0));
    }

    #[test]
    fn test_join_errors() {
        let mut manager = manager();
        let code = manager.create_lobby("Alice").unwrap().lobby_code;

        assert!(matches!(manager.join_lobby("", "Bob"), Err(LobbyError::InvalidInput(_))));
        assert!(matches!(manager.join_lobby(&code, ""), Err(LobbyError::InvalidInput(_))));
        // Missing fields win over an unknown code.
        assert!(matches!(manager.join_lobby("ZZZZZ", " "), Err(LobbyError::InvalidInput(_))));
        assert_eq!(
            manager.join_lobby("ZZZZZ", "Bob"),
            Err(LobbyError::NotFound("ZZZZZ".into()))
        );

        for name in ["Bob", "Carol", "Dave"] {
            manager.join_lobby(&code, name).unwrap();
        }
        assert_eq!(manager.lobby(&code).unwrap().players.len(), MAX_PLAYERS);
        assert_eq!(manager.join_lobby(&code, "Eve"), Err(LobbyError::Full(code.clone())));
    }

    #[test]
    fn test_status() {
        let mut manager = manager();
        let code = manager.create_lobby("Alice").unwrap().lobby_code;
        manager.join_lobby(&code, "Bob").unwrap();

        let status = manager.status(&code).unwrap();
        assert_eq!(status.lobby_code, code);
        assert_eq!(status.players, vec!["Alice", "Bob"]);

        assert!(matches!(manager.status(""), Err(LobbyError::InvalidInput(_))));
        assert!(matches!(manager.status("NOPE1"), Err(LobbyError::NotFound(_))));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut manager = manager();
        let code = manager.create_lobby("Alice").unwrap().lobby_code;
        assert!(manager.destroy(&code));
        assert!(!manager.destroy(&code));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_last_leave_destroys_lobby() {
        let mut manager = manager();
        let created = manager.create_lobby("Alice").unwrap();
        let bob = manager.join_lobby(&created.lobby_code, "Bob").unwrap();

        assert!(manager.leave(&created.lobby_code, &created.host_id));
        let lobby = manager.lobby(&created.lobby_code).unwrap();
        assert_eq!(lobby.host.as_deref(), Some(bob.player_id.as_str()));

        assert!(manager.leave(&created.lobby_code, &bob.player_id));
        assert!(manager.lobby(&created.lobby_code).is_none());

        // Stale references are no-ops.
        assert!(!manager.leave(&created.lobby_code, &bob.player_id));
        manager.tick(&created.lobby_code);
        manager.mark_ready(&created.lobby_code, &bob.player_id);
    }

    #[test]
    fn test_messages_drive_a_game() {
        let scheduler = CountingScheduler::default();
        let started = Arc::clone(&scheduler.started);
        let mut manager = LobbyManager::with_rng(Box::new(scheduler), StdRng::seed_from_u64(9));

        let created = manager.create_lobby("Alice").unwrap();
        let code = created.lobby_code.clone();
        let bob = manager.join_lobby(&code, "Bob").unwrap();

        manager.handle_message(&code, &created.host_id, ClientMessage::PlayerReady);
        manager.handle_message(&code, &bob.player_id, ClientMessage::PlayerReady);
        assert_eq!(manager.lobby(&code).unwrap().game.status, GameStatus::Playing);
        assert_eq!(started.load(Ordering::SeqCst), 1);

        manager.handle_message(
            &code,
            &created.host_id,
            ClientMessage::MovePaddle {
                direction: Direction::Right,
            },
        );
        assert_eq!(manager.lobby(&code).unwrap().game.paddles[0].x, 260.0);

        let before = manager.lobby(&code).unwrap().game.ball;
        manager.tick(&code);
        assert_ne!(manager.lobby(&code).unwrap().game.ball, before);

        manager.handle_message(&code, &bob.player_id, ClientMessage::LeaveLobby);
        let lobby = manager.lobby(&code).unwrap();
        assert_eq!(lobby.game.status, GameStatus::GameOver);
        assert!(!lobby.is_ticking());
    }
}
