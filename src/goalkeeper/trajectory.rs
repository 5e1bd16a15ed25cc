use crate::constants::{
    AIR_DENSITY, BALL_CROSS_SECTION, BALL_DRAG_COEFFICIENT, BALL_MASS, FIELD_WIDTH, GOAL_HEIGHT,
    GOAL_WIDTH, GRAVITY, GROUND_RESTITUTION,
};
use crate::context::Team;
use crate::physics::Ball;
use nalgebra::Vector3;

/// Coarse step used for look-ahead only; the real integrator stays at
/// the simulation timestep.
pub const PREDICTION_STEP: f32 = 0.1;
pub const PREDICTION_HORIZON: f32 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct TrajectorySample {
    pub time: f32,
    pub position: Vector3<f32>,
}

/// Where and when a ball will cross a goal line, if it does inside the
/// prediction horizon.
#[derive(Debug, Clone, Copy)]
pub struct GoalCrossing {
    pub time: f32,
    pub position: Vector3<f32>,
    /// Inside the goal mouth at crossing time.
    pub on_target: bool,
}

/// Forward-simulate the ball with drag and gravity at coarse steps.
/// Spin is ignored here; over a keeper's reaction window the Magnus
/// contribution is below the prediction error anyway.
pub fn predict(ball: &Ball, horizon: f32) -> Vec<TrajectorySample> {
    let mut samples = Vec::with_capacity((horizon / PREDICTION_STEP) as usize + 1);
    let mut position = ball.position;
    let mut velocity = ball.velocity;
    let mut time = 0.0;

    while time < horizon {
        let speed = velocity.norm();
        if speed > f32::EPSILON {
            let drag = 0.5 * AIR_DENSITY * speed * BALL_DRAG_COEFFICIENT * BALL_CROSS_SECTION;
            velocity -= velocity * (drag / BALL_MASS) * PREDICTION_STEP;
        }
        velocity.z -= GRAVITY * PREDICTION_STEP;

        position += velocity * PREDICTION_STEP;

        if position.z < 0.0 {
            position.z = 0.0;
            velocity.z = -velocity.z * GROUND_RESTITUTION;
        }

        time += PREDICTION_STEP;
        samples.push(TrajectorySample { time, position });
    }

    samples
}

/// First crossing of the goal line the given team defends, if the
/// predicted path reaches it within the horizon.
pub fn goal_line_crossing(ball: &Ball, defending: Team) -> Option<GoalCrossing> {
    let goal_x = defending.defended_goal().x;
    let mut previous = TrajectorySample {
        time: 0.0,
        position: ball.position,
    };

    for sample in predict(ball, PREDICTION_HORIZON) {
        let crossed = if goal_x == 0.0 {
            previous.position.x > goal_x && sample.position.x <= goal_x
        } else {
            previous.position.x < goal_x && sample.position.x >= goal_x
        };

        if crossed {
            // Interpolate to the exact plane crossing.
            let span = sample.position.x - previous.position.x;
            let fraction = if span.abs() < f32::EPSILON {
                0.0
            } else {
                (goal_x - previous.position.x) / span
            };
            let position = previous.position + (sample.position - previous.position) * fraction;
            let time = previous.time + (sample.time - previous.time) * fraction;

            let half_width = GOAL_WIDTH / 2.0;
            let on_target = (position.y - FIELD_WIDTH / 2.0).abs() <= half_width
                && position.z <= GOAL_HEIGHT
                && position.z >= 0.0;

            return Some(GoalCrossing {
                time,
                position,
                on_target,
            });
        }

        previous = sample;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_at(position: Vector3<f32>, velocity: Vector3<f32>) -> Ball {
        let mut ball = Ball::at_kickoff();
        ball.position = position;
        ball.velocity = velocity;
        ball
    }

    #[test]
    fn straight_shot_at_goal_is_on_target() {
        let ball = ball_at(
            Vector3::new(16.0, FIELD_WIDTH / 2.0, 0.3),
            Vector3::new(-20.0, 0.0, 1.0),
        );

        let crossing = goal_line_crossing(&ball, Team::Home).unwrap();
        assert!(crossing.on_target);
        assert!(crossing.time < 1.5);
    }

    #[test]
    fn wide_shot_crosses_off_target() {
        let ball = ball_at(
            Vector3::new(16.0, FIELD_WIDTH / 2.0 + 1.0, 0.3),
            Vector3::new(-20.0, 8.0, 0.5),
        );

        let crossing = goal_line_crossing(&ball, Team::Home).unwrap();
        assert!(!crossing.on_target);
    }

    #[test]
    fn ball_rolling_away_never_crosses() {
        let ball = ball_at(
            Vector3::new(30.0, FIELD_WIDTH / 2.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
        );

        assert!(goal_line_crossing(&ball, Team::Home).is_none());
    }

    #[test]
    fn prediction_respects_gravity() {
        let ball = ball_at(Vector3::new(50.0, 34.0, 0.0), Vector3::new(5.0, 0.0, 8.0));
        let samples = predict(&ball, 3.0);

        // Ball must come back down within the horizon.
        let apex = samples
            .iter()
            .map(|s| s.position.z)
            .fold(f32::MIN, f32::max);
        assert!(apex > 1.0);
        assert!(samples.last().unwrap().position.z < apex);
    }
}
