use crate::context::Difficulty;
use crate::physics::PlayerStats;
use rand::Rng;
use rand::RngExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacticalPreference {
    Attacking,
    Balanced,
    Defensive,
}

/// Fixed per-AI-player temperament, generated once at registration from
/// the player's ratings plus a random jitter, immutable for the match.
#[derive(Debug, Clone, Copy)]
pub struct AIPersonality {
    /// Appetite for low-probability, high-reward actions, [0, 1].
    pub risk_tolerance: f32,
    /// Willingness to challenge and press, [0, 1].
    pub aggression: f32,
    /// Quality of off-ball positioning reads, [0, 1].
    pub positioning_iq: f32,
    /// Personal thinking time added to the decision interval, seconds.
    pub decision_delay: f32,
    pub tactical_preference: TacticalPreference,
    /// Actions ahead this player anticipates; bounded by difficulty.
    pub prediction_depth: u8,
    /// Personal scatter applied to movement targets, meters.
    pub position_error: f32,
}

impl AIPersonality {
    pub fn generate(stats: &PlayerStats, difficulty: Difficulty, rng: &mut impl Rng) -> Self {
        let composure = stats.composure / 100.0;
        let strength = stats.strength / 100.0;
        let positioning = stats.positioning / 100.0;

        let risk_tolerance =
            (0.3 + composure * 0.4 + rng.random_range(-0.15..0.15)).clamp(0.0, 1.0);
        let aggression = (0.25 + strength * 0.5 + rng.random_range(-0.15..0.15)).clamp(0.0, 1.0);
        let positioning_iq = (positioning + rng.random_range(-0.15..0.15)).clamp(0.0, 1.0);

        let tactical_preference = if risk_tolerance > 0.65 {
            TacticalPreference::Attacking
        } else if aggression > 0.6 && risk_tolerance < 0.4 {
            TacticalPreference::Defensive
        } else {
            TacticalPreference::Balanced
        };

        AIPersonality {
            risk_tolerance,
            aggression,
            positioning_iq,
            decision_delay: 0.05 + (1.0 - composure) * 0.1 + rng.random_range(0.0..0.03),
            tactical_preference,
            prediction_depth: difficulty.prediction_depth(),
            // Sharper positional reads shave a little off the difficulty
            // error margin.
            position_error: difficulty.position_error() * (1.2 - positioning_iq * 0.3),
        }
    }

    /// Flat utility nudge this temperament gives each action class,
    /// shaded by the player's tactical leaning.
    pub fn action_bias(&self, action: super::decision::AiAction) -> f32 {
        use super::decision::AiAction;

        let base = match action {
            AiAction::Shoot => self.risk_tolerance * 0.6 + self.aggression * 0.2,
            AiAction::Pass => 0.5,
            AiAction::Dribble => self.risk_tolerance * 0.5,
            AiAction::Clear => (1.0 - self.risk_tolerance) * 0.6,
            AiAction::Tackle => self.aggression * 0.7,
            AiAction::HoldBall => 0.3,
            AiAction::MoveToSpace => self.positioning_iq * 0.6,
        };

        let leaning = match (self.tactical_preference, action) {
            (TacticalPreference::Attacking, AiAction::Shoot | AiAction::Dribble) => 0.15,
            (TacticalPreference::Defensive, AiAction::Clear | AiAction::Tackle) => 0.15,
            (TacticalPreference::Defensive, AiAction::Shoot) => -0.1,
            _ => 0.0,
        };

        base + leaning
    }
}
