use crate::context::Team;
use crate::physics::{MatchField, PlayerRole};
use log::debug;
use nalgebra::Vector3;

/// Minimum gap between any two switches, manual or automatic.
const SWITCH_COOLDOWN: f32 = 0.1;
/// Default pause between automatic candidate re-evaluations.
const DEFAULT_REEVALUATE_DELAY: f32 = 0.5;

const PROXIMITY_WEIGHT: f32 = 0.5;
const DEFENSIVE_LINE_WEIGHT: f32 = 0.3;
const INTENTION_WEIGHT: f32 = 0.2;

/// Decides which player of the human team holds the controller. Manual
/// requests and automatic switches share one candidate-scoring path;
/// goalkeepers are never handed control.
pub struct ControlSwitcher {
    team: Team,
    auto_enabled: bool,
    reevaluate_delay: f32,
    cooldown_remaining: f32,
    reevaluate_remaining: f32,
}

impl ControlSwitcher {
    pub fn new(team: Team, auto_enabled: bool) -> Self {
        ControlSwitcher {
            team,
            auto_enabled,
            reevaluate_delay: DEFAULT_REEVALUATE_DELAY,
            cooldown_remaining: 0.0,
            reevaluate_remaining: 0.0,
        }
    }

    pub fn with_reevaluate_delay(mut self, delay: f32) -> Self {
        self.reevaluate_delay = delay.max(SWITCH_COOLDOWN);
        self
    }

    pub fn team(&self) -> Team {
        self.team
    }

    /// Automatic switching; returns the newly controlled player when a
    /// better candidate took over this frame.
    pub fn tick(&mut self, field: &mut MatchField, dt: f32) -> Option<u32> {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);

        if !self.auto_enabled {
            return None;
        }

        self.reevaluate_remaining -= dt;
        if self.reevaluate_remaining > 0.0 || self.cooldown_remaining > 0.0 {
            return None;
        }
        self.reevaluate_remaining = self.reevaluate_delay;

        let current = field.controlled_player(self.team).map(|p| p.id);
        let best = self.best_candidate(field)?;

        if Some(best) == current {
            return None;
        }

        self.apply_switch(field, best);
        Some(best)
    }

    /// Manual switch request. Subject to the same cooldown and scoring
    /// as automatic switches.
    pub fn request_switch(&mut self, field: &mut MatchField) -> Option<u32> {
        if self.cooldown_remaining > 0.0 {
            return None;
        }

        let current = field.controlled_player(self.team).map(|p| p.id);
        let best = self.best_candidate(field)?;
        if Some(best) == current {
            return None;
        }

        self.apply_switch(field, best);
        Some(best)
    }

    fn apply_switch(&mut self, field: &mut MatchField, new_id: u32) {
        for player in &mut field.players {
            if player.team == self.team {
                player.is_controlled = player.id == new_id;
            }
        }
        self.cooldown_remaining = SWITCH_COOLDOWN;
        debug!("control to player {new_id}");
    }

    fn best_candidate(&self, field: &MatchField) -> Option<u32> {
        let defending = field
            .ball
            .last_touch_team
            .is_some_and(|t| t != self.team);

        field
            .team_players(self.team)
            .filter(|p| p.role != PlayerRole::Goalkeeper)
            .map(|p| (candidate_score(p, field.ball.position, defending), p.id))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, id)| id)
    }
}

/// Candidate quality: closeness to the ball, goal-side coverage while
/// defending, and whether the player is already oriented toward play.
fn candidate_score(
    player: &crate::physics::MatchPlayer,
    ball_position: Vector3<f32>,
    defending: bool,
) -> f32 {
    let to_ball = ball_position - player.position;
    let distance = to_ball.norm();
    let proximity = (1.0 - distance / 50.0).clamp(0.0, 1.0);

    let mut score = PROXIMITY_WEIGHT * proximity;

    if defending {
        // Being between the ball and the defended goal matters when the
        // other side has it.
        let own_goal = player.team.defended_goal();
        let ball_to_goal = (own_goal - ball_position).norm();
        let player_to_goal = (own_goal - player.position).norm();
        if player_to_goal < ball_to_goal {
            score += DEFENSIVE_LINE_WEIGHT;
        }
    }

    if distance > f32::EPSILON {
        let ball_bearing = to_ball.y.atan2(to_ball.x);
        let mut facing = (ball_bearing - player.heading).abs();
        if facing > std::f32::consts::PI {
            facing = 2.0 * std::f32::consts::PI - facing;
        }
        let facing_score = 1.0 - facing / std::f32::consts::PI;

        let speed = player.velocity.norm();
        let moving_score = if speed > 0.5 {
            (player.velocity.dot(&to_ball) / (speed * distance)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        score += INTENTION_WEIGHT * (facing_score + moving_score) / 2.0;
    }

    score
}
