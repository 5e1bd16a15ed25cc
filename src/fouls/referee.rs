use crate::constants::{FIELD_LENGTH, FIELD_WIDTH};
use crate::physics::MatchPlayer;
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;

/// Referees keep roughly this distance behind play.
const TRAIL_DISTANCE: f32 = 12.0;
const REFEREE_SPEED: f32 = 7.5;
/// Below this confidence the incident is simply not called.
pub const VISIBILITY_THRESHOLD: f32 = 0.3;
const OBSTRUCTION_PENALTY: f32 = 0.9;

/// Fixed refereeing temperament for the match. Presets are jittered at
/// kickoff so two strict referees are still not identical.
#[derive(Debug, Clone, Copy)]
pub struct RefereePersonality {
    /// Multiplier on card probabilities.
    pub card_tendency: f32,
    /// Probability of letting a light foul run as advantage.
    pub advantage_tendency: f32,
    /// How well the referee keeps up with play, [0, 1].
    pub positioning_quality: f32,
}

impl RefereePersonality {
    pub fn lenient() -> Self {
        RefereePersonality {
            card_tendency: 0.7,
            advantage_tendency: 0.8,
            positioning_quality: 0.85,
        }
    }

    pub fn balanced() -> Self {
        RefereePersonality {
            card_tendency: 1.0,
            advantage_tendency: 0.6,
            positioning_quality: 0.9,
        }
    }

    pub fn strict() -> Self {
        RefereePersonality {
            card_tendency: 1.3,
            advantage_tendency: 0.35,
            positioning_quality: 0.9,
        }
    }

    pub fn jittered(self, rng: &mut impl Rng) -> Self {
        RefereePersonality {
            card_tendency: (self.card_tendency + rng.random_range(-0.1..0.1)).max(0.1),
            advantage_tendency: (self.advantage_tendency + rng.random_range(-0.1..0.1))
                .clamp(0.0, 1.0),
            positioning_quality: (self.positioning_quality + rng.random_range(-0.05..0.05))
                .clamp(0.5, 1.0),
        }
    }
}

/// The referee is tracked as a point on the pitch; how far they are from
/// an incident and who stands in between decides whether it gets called.
#[derive(Debug)]
pub struct Referee {
    pub personality: RefereePersonality,
    pub position: Vector3<f32>,
}

impl Referee {
    pub fn new(personality: RefereePersonality) -> Self {
        Referee {
            personality,
            position: Vector3::new(FIELD_LENGTH / 2.0, FIELD_WIDTH / 2.0 - 10.0, 0.0),
        }
    }

    /// Chase a point trailing the ball toward midfield, at a capped speed.
    pub fn follow_play(&mut self, ball_position: Vector3<f32>, dt: f32) {
        let center = Vector3::new(FIELD_LENGTH / 2.0, FIELD_WIDTH / 2.0, 0.0);
        let to_center = center - ball_position;
        let trail = if to_center.norm() > f32::EPSILON {
            to_center.normalize() * TRAIL_DISTANCE
        } else {
            Vector3::new(0.0, -TRAIL_DISTANCE, 0.0)
        };

        let target = ball_position + trail;
        let offset = target - self.position;
        let distance = offset.norm();
        if distance > 0.5 {
            let step = (REFEREE_SPEED * dt).min(distance);
            self.position += offset / distance * step;
        }

        self.position.x = self.position.x.clamp(0.0, FIELD_LENGTH);
        self.position.y = self.position.y.clamp(0.0, FIELD_WIDTH);
    }

    /// Confidence that the referee saw an incident clearly: positioning
    /// quality, scaled down with distance, scaled again when a player not
    /// involved in the contact blocks the line of sight.
    pub fn visibility(&self, incident: Vector3<f32>, players: &[MatchPlayer]) -> f32 {
        let sight = incident - self.position;
        let distance = sight.norm();
        let distance_factor = (1.1 - distance / 50.0).clamp(0.3, 1.0);

        let mut confidence = self.personality.positioning_quality * distance_factor;

        if distance > f32::EPSILON {
            let direction = sight / distance;
            let obstructed = players.iter().any(|player| {
                let offset = player.position - self.position;
                let along = offset.dot(&direction);
                if along <= 0.0 || along >= distance - 1.5 {
                    return false;
                }
                (offset - direction * along).norm() < 1.0
            });

            if obstructed {
                confidence *= OBSTRUCTION_PENALTY;
            }
        }

        confidence
    }
}
