use crate::constants::{FIELD_LENGTH, FIELD_WIDTH, PLAYER_FRICTION};
use crate::context::Team;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Body frame affecting locomotion multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    Light,
    Medium,
    Heavy,
}

impl BodyType {
    pub fn speed_factor(&self) -> f32 {
        match self {
            BodyType::Light => 1.05,
            BodyType::Medium => 1.0,
            BodyType::Heavy => 0.93,
        }
    }

    pub fn acceleration_factor(&self) -> f32 {
        match self {
            BodyType::Light => 1.08,
            BodyType::Medium => 1.0,
            BodyType::Heavy => 0.9,
        }
    }
}

/// Per-player ratings on a 0-100 scale, fixed for the match.
///
/// Legacy rosters use alternate field names for some ratings; that
/// reconciliation happens once in [`PlayerStats::sanitized`], never in the
/// formulas that consume them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerStats {
    pub acceleration: f32,
    pub top_speed: f32,
    pub shot_power: f32,
    pub shot_accuracy: f32,
    pub reaction: f32,
    pub positioning: f32,
    pub dribbling: f32,
    pub balance: f32,
    pub strength: f32,
    pub composure: f32,
    pub jumping: f32,
    pub body_type: BodyType,
}

impl Default for PlayerStats {
    fn default() -> Self {
        PlayerStats {
            acceleration: 50.0,
            top_speed: 50.0,
            shot_power: 50.0,
            shot_accuracy: 50.0,
            reaction: 50.0,
            positioning: 50.0,
            dribbling: 50.0,
            balance: 50.0,
            strength: 50.0,
            composure: 50.0,
            jumping: 50.0,
            body_type: BodyType::Medium,
        }
    }
}

impl PlayerStats {
    /// Clamp every rating into the canonical 0-100 range at ingestion.
    pub fn sanitized(mut self) -> Self {
        for value in [
            &mut self.acceleration,
            &mut self.top_speed,
            &mut self.shot_power,
            &mut self.shot_accuracy,
            &mut self.reaction,
            &mut self.positioning,
            &mut self.dribbling,
            &mut self.balance,
            &mut self.strength,
            &mut self.composure,
            &mut self.jumping,
        ] {
            if !value.is_finite() {
                *value = 50.0;
            }
            *value = value.clamp(0.0, 100.0);
        }

        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    Outfield,
    Goalkeeper,
}

/// Movement intent for the current tick, written by human input or the AI,
/// consumed and cleared by the locomotion step.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementIntent {
    pub direction: Vector3<f32>,
    pub power: f32,
    pub sprinting: bool,
}

#[derive(Debug, Clone)]
pub struct MatchPlayer {
    pub id: u32,
    pub team: Team,
    pub role: PlayerRole,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub heading: f32,
    pub stats: PlayerStats,
    pub stamina: f32,
    pub is_controlled: bool,

    pub intent: MovementIntent,
}

const SPRINT_SPEED_RATIO: f32 = 0.8;
const STAMINA_DRAIN_RATE: f32 = 6.0; // per second at full sprint
const STAMINA_RECOVERY_RATE: f32 = 2.5; // per second while cruising

impl MatchPlayer {
    pub fn new(
        id: u32,
        team: Team,
        role: PlayerRole,
        position: Vector3<f32>,
        stats: PlayerStats,
    ) -> Self {
        MatchPlayer {
            id,
            team,
            role,
            position,
            velocity: Vector3::zeros(),
            heading: 0.0,
            stats: stats.sanitized(),
            stamina: 100.0,
            is_controlled: false,
            intent: MovementIntent::default(),
        }
    }

    /// Top speed once the top-speed rating, stamina and body type are
    /// applied. A 100-rated fresh light player runs just under 9.5 m/s.
    pub fn max_speed(&self) -> f32 {
        let base = 5.5 + self.stats.top_speed / 100.0 * 3.5;
        let stamina_factor = 0.6 + 0.4 * self.stamina / 100.0;

        base * stamina_factor * self.stats.body_type.speed_factor()
    }

    pub fn acceleration_magnitude(&self) -> f32 {
        let base = 4.0 + self.stats.acceleration / 100.0 * 6.0;

        base * self.stats.body_type.acceleration_factor()
    }

    /// One fixed physics step: integrate intent into velocity, apply
    /// friction, clamp to the stamina-scaled speed cap, integrate position,
    /// keep the player on the pitch, and update stamina.
    pub fn step(&mut self, dt: f32) {
        let intent = self.intent;

        if intent.power > 0.0 && intent.direction.norm() > f32::EPSILON {
            let accel = intent.direction.normalize()
                * self.acceleration_magnitude()
                * intent.power.clamp(0.0, 1.0);
            self.velocity += accel * dt;
        }

        // Ground friction decays velocity toward zero when coasting.
        let speed = self.velocity.norm();
        if speed > f32::EPSILON {
            let decel = PLAYER_FRICTION * dt;
            let new_speed = (speed - decel).max(0.0);
            self.velocity *= new_speed / speed;
        }

        let max_speed = if intent.sprinting {
            self.max_speed()
        } else {
            self.max_speed() * 0.75
        };

        let speed = self.velocity.norm();
        if speed > max_speed {
            self.velocity *= max_speed / speed;
        }

        self.position += self.velocity * dt;
        self.position.z = 0.0;
        self.clamp_to_pitch();

        if self.velocity.norm() > 0.3 {
            self.heading = self.velocity.y.atan2(self.velocity.x);
        }

        self.update_stamina(dt);
    }

    fn clamp_to_pitch(&mut self) {
        if self.position.x < 0.0 {
            self.position.x = 0.0;
            self.velocity.x = 0.0;
        }
        if self.position.x > FIELD_LENGTH {
            self.position.x = FIELD_LENGTH;
            self.velocity.x = 0.0;
        }
        if self.position.y < 0.0 {
            self.position.y = 0.0;
            self.velocity.y = 0.0;
        }
        if self.position.y > FIELD_WIDTH {
            self.position.y = FIELD_WIDTH;
            self.velocity.y = 0.0;
        }
    }

    fn update_stamina(&mut self, dt: f32) {
        let max_speed = self.max_speed();
        let speed_ratio = if max_speed > f32::EPSILON {
            self.velocity.norm() / max_speed
        } else {
            0.0
        };

        if speed_ratio > SPRINT_SPEED_RATIO {
            self.stamina -= STAMINA_DRAIN_RATE * speed_ratio * dt;
        } else {
            self.stamina += STAMINA_RECOVERY_RATE * (1.0 - speed_ratio) * dt;
        }

        self.stamina = self.stamina.clamp(0.0, 100.0);
    }

    /// Speed as a fraction of the current cap, used by fatigue modifiers.
    pub fn speed_ratio(&self) -> f32 {
        let max_speed = self.max_speed();
        if max_speed > f32::EPSILON {
            (self.velocity.norm() / max_speed).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
