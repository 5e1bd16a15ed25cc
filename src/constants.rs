//! Physical constants and pitch geometry shared by every subsystem.
//!
//! All distances are meters, speeds m/s, times seconds. The pitch lies in
//! the x/y plane: x runs along the length (home goal at x = 0), y across
//! the width, z points up.

pub const GRAVITY: f32 = 9.81;
pub const AIR_DENSITY: f32 = 1.225;

pub const BALL_MASS: f32 = 0.43;
pub const BALL_RADIUS: f32 = 0.11;
pub const BALL_DRAG_COEFFICIENT: f32 = 0.25;
pub const BALL_CROSS_SECTION: f32 = std::f32::consts::PI * BALL_RADIUS * BALL_RADIUS;
pub const MAGNUS_COEFFICIENT: f32 = 0.0004;
pub const SPIN_DECAY: f32 = 0.985;

pub const GROUND_RESTITUTION: f32 = 0.65;
pub const BALL_RESTITUTION: f32 = 0.7;
pub const PLAYER_RESTITUTION: f32 = 0.5;
pub const GROUND_FRICTION: f32 = 0.4; // horizontal deceleration fraction per second while rolling
pub const PLAYER_FRICTION: f32 = 4.0; // deceleration applied to player velocity, m/s^2

pub const FIELD_LENGTH: f32 = 105.0;
pub const FIELD_WIDTH: f32 = 68.0;
pub const GOAL_WIDTH: f32 = 7.32;
pub const GOAL_HEIGHT: f32 = 2.44;
pub const PENALTY_SPOT_DISTANCE: f32 = 11.0;
pub const PENALTY_AREA_DEPTH: f32 = 16.5;
pub const PENALTY_AREA_WIDTH: f32 = 40.3;
pub const WALL_DISTANCE: f32 = 9.15;

pub const PLAYER_RADIUS: f32 = 0.5;
pub const PLAYER_HEIGHT: f32 = 1.8;

pub const MAX_SHOT_SPEED: f32 = 25.0;
pub const MAX_PASS_SPEED: f32 = 15.0;
pub const MAX_PLAYER_SPEED: f32 = 12.0;
pub const BALL_SPEED_SANITY: f32 = 50.0;

pub const SIMULATION_TIMESTEP: f32 = 1.0 / 60.0;
pub const MAX_FRAME_TIME: f32 = 0.25;
pub const MAX_STEPS_PER_ADVANCE: u32 = 5;

/// Ticks between integrity validator passes (once per simulated second).
pub const VALIDATOR_INTERVAL_TICKS: u64 = 60;
