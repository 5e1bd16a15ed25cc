use crate::constants::{
    FIELD_LENGTH, FIELD_WIDTH, PENALTY_AREA_DEPTH, PENALTY_AREA_WIDTH,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Home,
    Away,
}

impl Team {
    pub fn opposite(&self) -> Team {
        match self {
            Team::Home => Team::Away,
            Team::Away => Team::Home,
        }
    }

    /// Center of the goal this team defends. Home defends x = 0.
    pub fn defended_goal(&self) -> Vector3<f32> {
        match self {
            Team::Home => Vector3::new(0.0, FIELD_WIDTH / 2.0, 0.0),
            Team::Away => Vector3::new(FIELD_LENGTH, FIELD_WIDTH / 2.0, 0.0),
        }
    }

    /// Center of the goal this team attacks.
    pub fn attacked_goal(&self) -> Vector3<f32> {
        self.opposite().defended_goal()
    }

    /// Sign of the attacking direction along the x axis.
    pub fn attack_direction(&self) -> f32 {
        match self {
            Team::Home => 1.0,
            Team::Away => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Legendary,
}

impl Difficulty {
    /// Extra reaction delay stacked on the AI decision interval, seconds.
    pub fn extra_delay(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.35,
            Difficulty::Normal => 0.25,
            Difficulty::Hard => 0.15,
            Difficulty::Legendary => 0.08,
        }
    }

    /// Positioning error margin applied to AI movement targets, meters.
    pub fn position_error(&self) -> f32 {
        match self {
            Difficulty::Easy => 3.0,
            Difficulty::Normal => 2.0,
            Difficulty::Hard => 1.0,
            Difficulty::Legendary => 0.2,
        }
    }

    /// How many actions ahead the AI is allowed to anticipate.
    pub fn prediction_depth(&self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
            Difficulty::Legendary => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Full regulation duration in simulated seconds (both halves).
    pub match_duration: f32,
    pub difficulty: Difficulty,
    pub extra_time_enabled: bool,
    pub penalties_enabled: bool,
    /// Seed for the per-match random generator; fixes every stochastic branch.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            match_duration: 90.0 * 60.0,
            difficulty: Difficulty::Normal,
            extra_time_enabled: false,
            penalties_enabled: false,
            seed: 0,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_duration.is_finite() || self.match_duration <= 0.0 {
            return Err(ConfigError::InvalidDuration(self.match_duration));
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("match duration must be positive and finite, got {0}")]
    InvalidDuration(f32),
    #[error("match requires at least one player per team")]
    EmptyRoster,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

impl Score {
    pub fn increment(&mut self, team: Team) {
        match team {
            Team::Home => self.home = self.home.saturating_add(1),
            Team::Away => self.away = self.away.saturating_add(1),
        }
    }

    pub fn is_level(&self) -> bool {
        self.home == self.away
    }

    /// Goal difference from the given team's point of view.
    pub fn margin_for(&self, team: Team) -> i16 {
        match team {
            Team::Home => self.home as i16 - self.away as i16,
            Team::Away => self.away as i16 - self.home as i16,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PenaltyArea {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl PenaltyArea {
    pub fn for_team(team: Team) -> Self {
        let y_min = (FIELD_WIDTH - PENALTY_AREA_WIDTH) / 2.0;
        let y_max = (FIELD_WIDTH + PENALTY_AREA_WIDTH) / 2.0;

        match team {
            Team::Home => PenaltyArea {
                min: Vector3::new(0.0, y_min, 0.0),
                max: Vector3::new(PENALTY_AREA_DEPTH, y_max, 0.0),
            },
            Team::Away => PenaltyArea {
                min: Vector3::new(FIELD_LENGTH - PENALTY_AREA_DEPTH, y_min, 0.0),
                max: Vector3::new(FIELD_LENGTH, y_max, 0.0),
            },
        }
    }

    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Per-frame view of the whole match handed to presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub ball_position: [f32; 3],
    pub ball_velocity: [f32; 3],
    pub players: Vec<PlayerSnapshot>,
    pub match_time: f64,
    pub stoppage_display: String,
    pub score: Score,
    pub phase: crate::time::MatchPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u32,
    pub team: Team,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub stamina: f32,
    pub is_controlled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_centers_face_each_other() {
        assert_eq!(Team::Home.defended_goal().x, 0.0);
        assert_eq!(Team::Home.attacked_goal().x, FIELD_LENGTH);
        assert_eq!(Team::Away.attacked_goal().x, 0.0);
    }

    #[test]
    fn config_rejects_bad_duration() {
        let mut config = GameConfig::default();
        config.match_duration = -1.0;
        assert!(config.validate().is_err());

        config.match_duration = 90.0 * 60.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn score_margin_is_symmetric() {
        let mut score = Score::default();
        score.increment(Team::Home);
        score.increment(Team::Home);
        score.increment(Team::Away);

        assert_eq!(score.margin_for(Team::Home), 1);
        assert_eq!(score.margin_for(Team::Away), -1);
        assert!(!score.is_level());
    }
}
