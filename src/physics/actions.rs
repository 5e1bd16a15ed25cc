use crate::constants::{MAX_PASS_SPEED, MAX_SHOT_SPEED};
use crate::physics::ball::Ball;
use crate::physics::player::MatchPlayer;
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;

/// Widest angular deviation a wild, low-accuracy strike can pick up.
const MAX_SHOT_DEVIATION: f32 = 0.25;
const MAX_PASS_DEVIATION: f32 = 0.15;
const TACKLE_BALL_SPEED: f32 = 8.0;

/// Strike the ball: normalized direction + power in [0, 1] become ball
/// velocity, capped by the shot ceiling and scaled by the shot-power
/// rating. Low accuracy widens the random angular spread.
pub fn shoot(
    player: &MatchPlayer,
    ball: &mut Ball,
    direction: Vector3<f32>,
    power: f32,
    rng: &mut impl Rng,
) {
    let power = power.clamp(0.0, 1.0);
    let speed = MAX_SHOT_SPEED * power * (0.5 + 0.5 * player.stats.shot_power / 100.0);

    let deviation = deviation_angle(player.stats.shot_accuracy, power, MAX_SHOT_DEVIATION, rng);
    let aimed = rotate_about_z(direction, deviation);

    launch(player, ball, aimed, speed);
}

/// Push a pass along the lane; same contract as [`shoot`] with the pass
/// ceiling and a tighter spread.
pub fn pass(
    player: &MatchPlayer,
    ball: &mut Ball,
    direction: Vector3<f32>,
    power: f32,
    rng: &mut impl Rng,
) {
    let power = power.clamp(0.0, 1.0);
    let speed = MAX_PASS_SPEED * (0.4 + 0.6 * power);

    let deviation = deviation_angle(player.stats.shot_accuracy, power, MAX_PASS_DEVIATION, rng);
    let aimed = rotate_about_z(direction, deviation);

    launch(player, ball, aimed, speed);
}

/// A tackle pokes the ball loose rather than placing it: fixed moderate
/// speed, wide spread.
pub fn tackle(
    player: &MatchPlayer,
    ball: &mut Ball,
    direction: Vector3<f32>,
    rng: &mut impl Rng,
) {
    let deviation = rng.random_range(-0.4..0.4);
    let aimed = rotate_about_z(direction, deviation);

    launch(player, ball, aimed, TACKLE_BALL_SPEED);
}

fn launch(player: &MatchPlayer, ball: &mut Ball, direction: Vector3<f32>, speed: f32) {
    let norm = direction.norm();
    if norm < f32::EPSILON {
        return;
    }

    ball.velocity = direction / norm * speed;
    ball.owner = None;
    ball.touch(player.id, player.team);
}

fn deviation_angle(accuracy: f32, power: f32, max_deviation: f32, rng: &mut impl Rng) -> f32 {
    let inaccuracy = 1.0 - accuracy / 100.0;
    let spread = inaccuracy * (0.3 + 0.7 * power) * max_deviation;

    if spread > f32::EPSILON {
        rng.random_range(-spread..spread)
    } else {
        0.0
    }
}

fn rotate_about_z(v: Vector3<f32>, angle: f32) -> Vector3<f32> {
    let (sin, cos) = angle.sin_cos();

    Vector3::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos, v.z)
}
