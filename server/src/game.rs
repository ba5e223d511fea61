//! Per-lobby game state machine: WAITING -> PLAYING -> GAME_OVER.
//!
//! Every transition runs to completion on the dispatcher, so a lobby is never
//! observed half-way through a transition.

use crate::lobby::Lobby;
use crate::physics;
use crate::tick::TickScheduler;
use crate::utils::get_timestamp;
use log::{debug, info};
use rand::Rng;
use shared::{
    Ball, Direction, GameStatus, Paddle, PlayerId, ServerMessage, WINNING_SCORE,
};
use std::collections::HashMap;

/// Winner name announced when a game ends without a resolvable winner.
pub const UNKNOWN_WINNER: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct GameState {
    pub status: GameStatus,
    pub ball: Ball,
    /// Built when a game starts; stale outside PLAYING.
    pub paddles: Vec<Paddle>,
    pub scores: HashMap<PlayerId, u32>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            status: GameStatus::Waiting,
            ball: Ball::centered(),
            paddles: Vec::new(),
            scores: HashMap::new(),
        }
    }

    pub fn paddle_mut(&mut self, player_id: &str) -> Option<&mut Paddle> {
        self.paddles.iter_mut().find(|p| p.player_id == player_id)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl Lobby {
    fn all_ready(&self) -> bool {
        self.players.len() >= 2 && self.players.iter().all(|p| p.ready)
    }

    /// Marks a player ready and starts the game once everyone is.
    pub fn mark_ready<R: Rng>(&mut self, player_id: &str, rng: &mut R, scheduler: &dyn TickScheduler) {
        if self.game.status != GameStatus::Waiting {
            return;
        }
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        player.ready = true;
        debug!("Player {} is ready in lobby {}", player_id, self.code);

        if self.all_ready() {
            self.start_game(rng, scheduler);
        } else {
            self.broadcast_state();
        }
    }

    /// Lays out paddles, serves the ball, zeroes the scores and starts the clock.
    pub fn start_game<R: Rng>(&mut self, rng: &mut R, scheduler: &dyn TickScheduler) {
        self.game.paddles = self
            .players
            .iter()
            .map(|p| physics::paddle_for(&p.id, p.side))
            .collect();
        self.game.ball = physics::serve(rng);
        self.game.scores = self.players.iter().map(|p| (p.id.clone(), 0)).collect();
        self.game.status = GameStatus::Playing;

        info!(
            "Game started in lobby {} with {} players",
            self.code,
            self.players.len()
        );
        self.broadcast(&ServerMessage::GameStart {
            start_time: get_timestamp(),
        });

        // Never two clocks for one lobby: the old handle is dropped first.
        self.tick = None;
        self.tick = Some(scheduler.start(&self.code));
    }

    /// Moves the player's paddle one step. Ignored unless PLAYING.
    pub fn move_paddle(&mut self, player_id: &str, direction: Direction) {
        if self.game.status != GameStatus::Playing {
            return;
        }
        let Some(paddle) = self.game.paddle_mut(player_id) else {
            return;
        };
        if !physics::move_paddle(paddle, direction) {
            debug!("Ignoring {:?} for {:?} paddle of {}", direction, paddle.side, player_id);
        }
        self.broadcast_state();
    }

    /// Leave procedure shared by explicit leave and channel closure.
    ///
    /// Returns the departed player, or None if they were not a member. The
    /// caller destroys the lobby if this emptied it.
    pub fn leave(&mut self, player_id: &str) -> Option<crate::lobby::Player> {
        let player = self.remove_player(player_id)?;
        info!("Player {} ({}) left lobby {}", player.name, player.id, self.code);

        self.broadcast(&ServerMessage::PlayerLeft {
            player_name: player.name.clone(),
        });

        if self.game.status == GameStatus::Playing {
            self.end_game(None);
        } else {
            self.broadcast_state();
        }

        Some(player)
    }

    /// Advances the simulation by one tick. Stale ticks outside PLAYING are ignored.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) {
        if self.game.status != GameStatus::Playing {
            return;
        }

        if let Some(wall) = physics::step(&mut self.game.ball, &self.game.paddles) {
            let scorer_side = physics::scoring_side(wall);
            let scorer = self
                .game
                .paddles
                .iter()
                .find(|p| p.side == scorer_side)
                .map(|p| p.player_id.clone());

            let mut winner = None;
            match scorer.and_then(|id| self.game.scores.get_mut(&id).map(|score| (id, score))) {
                Some((id, score)) => {
                    *score += 1;
                    info!("Point for {} in lobby {} ({} total)", id, self.code, score);
                    if *score >= WINNING_SCORE {
                        winner = Some(id);
                    }
                }
                None => debug!("Ball left through unguarded {:?} wall in lobby {}", wall, self.code),
            }

            if let Some(winner) = winner {
                self.end_game(Some(&winner));
                return;
            }
            self.game.ball = physics::serve(rng);
        }

        self.broadcast_state();
    }

    /// Stops the clock and announces the result. Readiness is reset so the
    /// roster shows everyone as idle.
    pub fn end_game(&mut self, winner: Option<&str>) {
        if self.game.status != GameStatus::Playing {
            return;
        }
        self.tick = None;
        self.game.status = GameStatus::GameOver;

        let winner_name = winner
            .and_then(|id| self.player(id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| UNKNOWN_WINNER.to_string());
        info!("Game over in lobby {}, winner: {}", self.code, winner_name);

        self.broadcast(&ServerMessage::GameOver {
            winner: winner_name,
        });
        for player in &mut self.players {
            player.ready = false;
        }
        self.broadcast_state();
    }
}
