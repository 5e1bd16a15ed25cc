use crate::constants::{
    BALL_SPEED_SANITY, FIELD_LENGTH, FIELD_WIDTH, MAX_PLAYER_SPEED,
};
use crate::physics::MatchField;
use log::warn;
use nalgebra::Vector3;

/// How far outside the pitch a position may drift before the validator
/// considers it corrupt. Normal play never reaches this.
const POSITION_MARGIN: f32 = 5.0;
const MAX_BALL_ALTITUDE: f32 = 40.0;

/// Defensive backstop run roughly once per second: snap out-of-range
/// positions and velocities back to safe values. Not part of normal
/// gameplay; every correction is logged.
pub fn validate(field: &mut MatchField) {
    validate_ball(field);
    validate_players(field);
}

fn validate_ball(field: &mut MatchField) {
    let ball = &mut field.ball;

    if !ball.position.iter().all(|c| c.is_finite()) || !ball.velocity.iter().all(|c| c.is_finite())
    {
        warn!("ball state non-finite, resetting to kickoff spot");
        ball.reset_to_kickoff();
        return;
    }

    if ball.position.x < -POSITION_MARGIN
        || ball.position.x > FIELD_LENGTH + POSITION_MARGIN
        || ball.position.y < -POSITION_MARGIN
        || ball.position.y > FIELD_WIDTH + POSITION_MARGIN
        || ball.position.z > MAX_BALL_ALTITUDE
    {
        warn!("ball position out of bounds: {:?}", ball.position);
        ball.position.x = ball.position.x.clamp(0.0, FIELD_LENGTH);
        ball.position.y = ball.position.y.clamp(0.0, FIELD_WIDTH);
        ball.position.z = ball.position.z.clamp(0.0, MAX_BALL_ALTITUDE);
        ball.velocity = Vector3::zeros();
    }

    let speed = ball.velocity.norm();
    if speed > BALL_SPEED_SANITY {
        warn!("ball speed {:.1} exceeds sanity bound, rescaling", speed);
        ball.velocity *= BALL_SPEED_SANITY / speed;
    }
}

fn validate_players(field: &mut MatchField) {
    for player in &mut field.players {
        if !player.position.iter().all(|c| c.is_finite())
            || !player.velocity.iter().all(|c| c.is_finite())
        {
            warn!("player {} state non-finite, resetting", player.id);
            player.position = Vector3::new(FIELD_LENGTH / 2.0, FIELD_WIDTH / 2.0, 0.0);
            player.velocity = Vector3::zeros();
            continue;
        }

        let clamped_x = player.position.x.clamp(0.0, FIELD_LENGTH);
        let clamped_y = player.position.y.clamp(0.0, FIELD_WIDTH);
        if clamped_x != player.position.x || clamped_y != player.position.y {
            warn!("player {} off pitch at {:?}", player.id, player.position);
            player.position.x = clamped_x;
            player.position.y = clamped_y;
        }

        let speed = player.velocity.norm();
        if speed > MAX_PLAYER_SPEED {
            warn!("player {} speed {:.1} impossible, rescaling", player.id, speed);
            player.velocity *= MAX_PLAYER_SPEED / speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Team;
    use crate::physics::player::{MatchPlayer, PlayerRole, PlayerStats};

    fn field_with_player() -> MatchField {
        MatchField::new(vec![MatchPlayer::new(
            1,
            Team::Home,
            PlayerRole::Outfield,
            Vector3::new(50.0, 34.0, 0.0),
            PlayerStats::default(),
        )])
    }

    #[test]
    fn runaway_ball_speed_is_rescaled() {
        let mut field = field_with_player();
        field.ball.velocity = Vector3::new(500.0, 0.0, 0.0);

        validate(&mut field);

        assert!(field.ball.velocity.norm() <= BALL_SPEED_SANITY + 1e-3);
    }

    #[test]
    fn nan_ball_resets_to_kickoff() {
        let mut field = field_with_player();
        field.ball.position = Vector3::new(f32::NAN, 0.0, 0.0);

        validate(&mut field);

        assert!(field.ball.position.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn stranded_player_is_pulled_back() {
        let mut field = field_with_player();
        field.players[0].position = Vector3::new(-50.0, 34.0, 0.0);
        field.players[0].velocity = Vector3::new(100.0, 0.0, 0.0);

        validate(&mut field);

        assert!(field.players[0].position.x >= 0.0);
        assert!(field.players[0].velocity.norm() <= MAX_PLAYER_SPEED + 1e-3);
    }

    #[test]
    fn sane_state_is_untouched() {
        let mut field = field_with_player();
        field.ball.velocity = Vector3::new(20.0, 0.0, 0.0);
        let before = field.ball.velocity;

        validate(&mut field);

        assert_eq!(field.ball.velocity, before);
    }
}
