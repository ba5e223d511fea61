use shared::{
    Ball, Direction, GameSnapshot, GameStatus, Paddle, PlayerId, ServerMessage, Side, BALL_SIZE,
    FIELD_SIZE, PADDLE_STEP,
};

/// Local mirror of the latest state the server pushed.
#[derive(Debug, Clone)]
pub struct LocalView {
    pub player_id: PlayerId,
    pub snapshot: Option<GameSnapshot>,
    pub winner: Option<String>,
    /// Ball position of the last frame `next_move` reacted to.
    steered_at: Option<Ball>,
}

impl LocalView {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            snapshot: None,
            winner: None,
            steered_at: None,
        }
    }

    /// Folds one server message into the view.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::GameStateUpdate(snapshot) => self.snapshot = Some(snapshot.clone()),
            ServerMessage::GameOver { winner } => self.winner = Some(winner.clone()),
            _ => {}
        }
    }

    pub fn status(&self) -> Option<GameStatus> {
        self.snapshot.as_ref().map(|s| s.status)
    }

    pub fn my_side(&self) -> Option<Side> {
        self.snapshot
            .as_ref()?
            .players
            .iter()
            .find(|p| p.id == self.player_id)
            .map(|p| p.side)
    }

    pub fn my_paddle(&self) -> Option<&Paddle> {
        self.snapshot
            .as_ref()?
            .paddles
            .iter()
            .find(|p| p.player_id == self.player_id)
    }

    pub fn my_score(&self) -> u32 {
        self.snapshot
            .as_ref()
            .and_then(|s| s.scores.get(&self.player_id).copied())
            .unwrap_or(0)
    }

    /// Direction that brings our paddle's center toward the ball's center on
    /// the paddle's movable axis.
    ///
    /// None when not playing or without a paddle. Also None when already
    /// within half a step, or when the paddle is pinned against the wall it
    /// would move toward.
    pub fn steer(&self) -> Option<Direction> {
        let snapshot = self.snapshot.as_ref()?;
        if snapshot.status != GameStatus::Playing {
            return None;
        }
        let paddle = self.my_paddle()?;
        let ball = &snapshot.ball;

        let (ball_center, paddle_center) = if paddle.side.is_horizontal() {
            (ball.x + BALL_SIZE / 2.0, paddle.x + paddle.width / 2.0)
        } else {
            (ball.y + BALL_SIZE / 2.0, paddle.y + paddle.height / 2.0)
        };
        let offset = ball_center - paddle_center;
        if offset.abs() <= PADDLE_STEP / 2.0 {
            return None;
        }

        let (position, length) = if paddle.side.is_horizontal() {
            (paddle.x, paddle.width)
        } else {
            (paddle.y, paddle.height)
        };
        let pinned = if offset < 0.0 {
            position <= 0.0
        } else {
            position >= FIELD_SIZE - length
        };
        if pinned {
            return None;
        }

        let direction = match (paddle.side.is_horizontal(), offset < 0.0) {
            (true, true) => Direction::Left,
            (true, false) => Direction::Right,
            (false, true) => Direction::Up,
            (false, false) => Direction::Down,
        };
        Some(direction)
    }

    /// Like `steer`, but answers at most once per simulation frame.
    ///
    /// Every accepted move makes the server push another snapshot with the
    /// same ball, so only a moved ball is worth reacting to.
    pub fn next_move(&mut self) -> Option<Direction> {
        let ball = self.snapshot.as_ref()?.ball;
        if self.steered_at == Some(ball) {
            return None;
        }
        self.steered_at = Some(ball);
        self.steer()
    }
}
