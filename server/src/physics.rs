//! Playfield geometry for the authoritative simulation.
//!
//! Everything here operates on values passed in; the only non-determinism is
//! the serve direction, drawn from the caller's random source.

use rand::Rng;
use shared::{
    Ball, Direction, Paddle, Side, BALL_SIZE, FIELD_SIZE, PADDLE_LENGTH, PADDLE_MARGIN,
    PADDLE_STEP, PADDLE_THICKNESS, SERVE_SPEED, SPEEDUP,
};

/// Builds the paddle a player guarding `side` starts a game with.
pub fn paddle_for(player_id: &str, side: Side) -> Paddle {
    let centered = (FIELD_SIZE - PADDLE_LENGTH) / 2.0;
    let far_edge = FIELD_SIZE - PADDLE_MARGIN - PADDLE_THICKNESS;

    let (x, y, width, height) = match side {
        Side::Top => (centered, PADDLE_MARGIN, PADDLE_LENGTH, PADDLE_THICKNESS),
        Side::Bottom => (centered, far_edge, PADDLE_LENGTH, PADDLE_THICKNESS),
        Side::Left => (PADDLE_MARGIN, centered, PADDLE_THICKNESS, PADDLE_LENGTH),
        Side::Right => (far_edge, centered, PADDLE_THICKNESS, PADDLE_LENGTH),
    };

    Paddle {
        player_id: player_id.to_string(),
        side,
        x,
        y,
        width,
        height,
    }
}

/// Returns a ball at the center of the field moving diagonally at serve speed.
/// The sign of each velocity component is drawn independently.
pub fn serve<R: Rng>(rng: &mut R) -> Ball {
    let mut ball = Ball::centered();
    ball.vx = if rng.gen_bool(0.5) { SERVE_SPEED } else { -SERVE_SPEED };
    ball.vy = if rng.gen_bool(0.5) { SERVE_SPEED } else { -SERVE_SPEED };
    ball
}

/// Strict AABB overlap between the ball box and a paddle. Touching edges do not collide.
pub fn collides(ball: &Ball, paddle: &Paddle) -> bool {
    ball.x < paddle.x + paddle.width
        && ball.x + BALL_SIZE > paddle.x
        && ball.y < paddle.y + paddle.height
        && ball.y + BALL_SIZE > paddle.y
}

/// Reflects the ball off a paddle guarding `side` and speeds it up.
pub fn bounce(ball: &mut Ball, side: Side) {
    if side.is_horizontal() {
        ball.vy = -ball.vy;
    } else {
        ball.vx = -ball.vx;
    }
    ball.vx *= SPEEDUP;
    ball.vy *= SPEEDUP;
}

/// Returns the wall the ball has left the field through, if any.
///
/// Walls are checked in a fixed order (top, right, bottom, left) and the first
/// match wins.
pub fn crossed_wall(ball: &Ball) -> Option<Side> {
    if ball.y < 0.0 {
        Some(Side::Top)
    } else if ball.x > FIELD_SIZE {
        Some(Side::Right)
    } else if ball.y > FIELD_SIZE {
        Some(Side::Bottom)
    } else if ball.x < 0.0 {
        Some(Side::Left)
    } else {
        None
    }
}

/// The side whose guard is credited when the ball leaves through `wall`.
pub fn scoring_side(wall: Side) -> Side {
    wall.opposite()
}

/// Advances the ball by one tick and resolves paddle hits.
///
/// Only the first paddle (in slice order) the ball overlaps is bounced off.
/// Returns the wall the ball crossed, if it left the field this tick.
pub fn step(ball: &mut Ball, paddles: &[Paddle]) -> Option<Side> {
    ball.x += ball.vx;
    ball.y += ball.vy;

    if let Some(paddle) = paddles.iter().find(|paddle| collides(ball, paddle)) {
        bounce(ball, paddle.side);
    }

    crossed_wall(ball)
}

/// Moves a paddle one step along its movable axis, clamped to the field.
///
/// Returns false if `direction` lies on the paddle's fixed axis, in which case
/// the paddle is left untouched.
pub fn move_paddle(paddle: &mut Paddle, direction: Direction) -> bool {
    if paddle.side.is_horizontal() {
        let dx = match direction {
            Direction::Left => -PADDLE_STEP,
            Direction::Right => PADDLE_STEP,
            Direction::Up | Direction::Down => return false,
        };
        paddle.x = (paddle.x + dx).clamp(0.0, FIELD_SIZE - paddle.width);
    } else {
        let dy = match direction {
            Direction::Up => -PADDLE_STEP,
            Direction::Down => PADDLE_STEP,
            Direction::Left | Direction::Right => return false,
        };
        paddle.y = (paddle.y + dy).clamp(0.0, FIELD_SIZE - paddle.height);
    }
    true
}
