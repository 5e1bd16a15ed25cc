use crate::ai::perception::{PerceptionData, SAFE_PASS_RADIUS};
use crate::ai::personality::AIPersonality;
use crate::context::Difficulty;
use crate::learning::AdaptiveLearning;
use crate::physics::{MatchField, MatchPlayer, PlayerRole};
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;
use std::collections::HashMap;

/// Base re-evaluation interval before personality and difficulty delays.
const DECISION_INTERVAL: f32 = 0.1;

/// Inside this range a shot is a serious option.
const SHOOTING_RANGE: f32 = 30.0;
const TACKLE_RANGE: f32 = 3.0;

const WEIGHT_POSITION: f32 = 0.25;
const WEIGHT_SUCCESS: f32 = 0.30;
const WEIGHT_TACTICAL: f32 = 0.20;
const WEIGHT_RISK: f32 = 0.15;
const WEIGHT_FATIGUE: f32 = 0.05;
const WEIGHT_PERSONALITY: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Shoot,
    Pass,
    Dribble,
    Clear,
    Tackle,
    HoldBall,
    MoveToSpace,
}

/// What one AI player wants this tick. The engine converts intents into
/// physics actions; the AI never mutates field state itself.
#[derive(Debug, Clone, Copy)]
pub struct AiIntent {
    pub player_id: u32,
    pub action: AiAction,
    pub direction: Vector3<f32>,
    pub power: f32,
    pub move_target: Option<Vector3<f32>>,
}

/// Match situation shared by every deciding player this frame.
#[derive(Debug, Clone, Copy)]
pub struct GameStateView {
    /// Goal margin from the home side (positive = home leads).
    pub home_margin: i16,
    /// Fraction of regulation elapsed, [0, 1].
    pub elapsed_fraction: f32,
    /// Learned scoring tendency of the current ball carrier, [0, 1];
    /// 0.5 when nobody owns the ball or no history exists yet.
    pub carrier_threat: f32,
}

impl GameStateView {
    pub fn margin_for(&self, team: crate::context::Team) -> i16 {
        match team {
            crate::context::Team::Home => self.home_margin,
            crate::context::Team::Away => -self.home_margin,
        }
    }
}

struct AiEntry {
    personality: AIPersonality,
    next_decision_at: f64,
}

/// Utility-based decision engine for every non-controlled outfield
/// player. Each registered player keeps an independent decision timer; in
/// between decisions the last intent stands.
pub struct TacticalAi {
    difficulty: Difficulty,
    entries: HashMap<u32, AiEntry>,
}

impl TacticalAi {
    pub fn new(difficulty: Difficulty) -> Self {
        TacticalAi {
            difficulty,
            entries: HashMap::new(),
        }
    }

    pub fn register_player(&mut self, player: &MatchPlayer, rng: &mut impl Rng) {
        self.entries.insert(
            player.id,
            AiEntry {
                personality: AIPersonality::generate(&player.stats, self.difficulty, rng),
                next_decision_at: 0.0,
            },
        );
    }

    pub fn personality(&self, player_id: u32) -> Option<&AIPersonality> {
        self.entries.get(&player_id).map(|e| &e.personality)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Ticked once per rendered frame; each player only re-decides when
    /// its own interval has elapsed.
    pub fn tick(
        &mut self,
        field: &MatchField,
        game_state: GameStateView,
        clock: f64,
        learning: &AdaptiveLearning,
        rng: &mut impl Rng,
    ) -> Vec<AiIntent> {
        let mut intents = Vec::new();

        for player in &field.players {
            if player.is_controlled || player.role == PlayerRole::Goalkeeper {
                continue;
            }

            let Some(entry) = self.entries.get_mut(&player.id) else {
                continue;
            };

            if clock < entry.next_decision_at {
                continue;
            }

            let total_delay = DECISION_INTERVAL
                + entry.personality.decision_delay
                + self.difficulty.extra_delay();
            entry.next_decision_at = clock + total_delay as f64;

            // A carrier whose pass habits are on record telegraphs those
            // lanes to the defense.
            let habitual = learning.predicted_pass_direction(player.id);
            let perception =
                PerceptionData::build(player, field, &entry.personality, habitual, rng);

            let intent = decide(player, &perception, &entry.personality, game_state, rng);
            intents.push(intent);
        }

        intents
    }
}

fn decide(
    player: &MatchPlayer,
    perception: &PerceptionData,
    personality: &AIPersonality,
    game_state: GameStateView,
    rng: &mut impl Rng,
) -> AiIntent {
    let candidates: &[AiAction] = if perception.has_ball {
        &[
            AiAction::Shoot,
            AiAction::Pass,
            AiAction::Dribble,
            AiAction::Clear,
            AiAction::HoldBall,
        ]
    } else {
        &[AiAction::Tackle, AiAction::MoveToSpace]
    };

    // Ties and all-negative utilities fall through to the safe default.
    let default = if perception.has_ball {
        AiAction::HoldBall
    } else {
        AiAction::MoveToSpace
    };
    let mut best = default;
    let mut best_utility = if perception.has_ball { 0.0 } else { f32::MIN };

    for &action in candidates {
        let utility = action_utility(action, player, perception, personality, game_state);
        if utility > best_utility {
            best_utility = utility;
            best = action;
        }
    }

    build_intent(best, player, perception, rng)
}

/// Weighted utility for one candidate action:
/// `0.25·position + 0.30·success + 0.20·tactical + 0.15·risk +
/// 0.05·fatigue + 0.05·personality`.
pub fn action_utility(
    action: AiAction,
    player: &MatchPlayer,
    perception: &PerceptionData,
    personality: &AIPersonality,
    game_state: GameStateView,
) -> f32 {
    WEIGHT_POSITION * position_score(action, player, perception)
        + WEIGHT_SUCCESS * success_probability(action, player, perception)
        + WEIGHT_TACTICAL * tactical_need(action, player, perception, game_state)
        + WEIGHT_RISK
            * risk_factor(
                action,
                personality,
                game_state.margin_for(player.team),
                game_state.elapsed_fraction,
            )
        + WEIGHT_FATIGUE * fatigue_modifier(action, player)
        + WEIGHT_PERSONALITY * personality.action_bias(action)
}

/// Closed-form pass success:
/// `1 − distance_factor × pressure_factor × interception_risk`, with the
/// distance factor normalized to the 30 m safe radius.
pub fn pass_success_probability(
    distance: f32,
    pressure_count: usize,
    interception_risk: f32,
) -> f32 {
    let distance_factor = (distance / SAFE_PASS_RADIUS).clamp(0.05, 1.0);
    let pressure_factor = (0.3 + 0.35 * pressure_count as f32).clamp(0.0, 1.0);
    let interception = interception_risk.clamp(0.05, 1.0);

    (1.0 - distance_factor * pressure_factor * interception).clamp(0.0, 1.0)
}

/// Closed-form shot success:
/// `(accuracy × angle × balance × timing) / (gk_positioning × pressure)`.
pub fn shot_success_probability(
    accuracy: f32,
    angle_factor: f32,
    balance: f32,
    timing_precision: f32,
    gk_positioning: f32,
    defensive_pressure: f32,
) -> f32 {
    let numerator = (accuracy / 100.0).clamp(0.0, 1.0)
        * angle_factor.clamp(0.0, 1.0)
        * (balance / 100.0).clamp(0.0, 1.0)
        * timing_precision.clamp(0.0, 1.0);
    let denominator = gk_positioning.max(1.0) * defensive_pressure.max(1.0);

    (numerator / denominator).clamp(0.0, 1.0)
}

pub fn dribble_success_probability(
    dribbling: f32,
    pressure_count: usize,
    stamina: f32,
) -> f32 {
    let pressure_factor = 1.0 / (1.0 + pressure_count as f32 * 0.4);

    ((dribbling / 100.0) * pressure_factor * (0.4 + 0.6 * stamina / 100.0)).clamp(0.0, 1.0)
}

pub fn tackle_success_probability(strength: f32, distance_to_carrier: f32) -> f32 {
    let range_factor = if distance_to_carrier <= TACKLE_RANGE {
        1.0
    } else {
        0.3
    };

    ((strength / 100.0) * range_factor).clamp(0.0, 1.0)
}

fn success_probability(action: AiAction, player: &MatchPlayer, perception: &PerceptionData) -> f32 {
    match action {
        AiAction::Pass => match perception.best_lane() {
            Some(lane) => pass_success_probability(
                lane.distance,
                perception.pressure_count,
                lane.interception_risk,
            ),
            None => 0.0,
        },
        AiAction::Shoot => {
            let distance = perception.distance_to_goal(player.position);
            let angle_factor = (1.0 - distance / 45.0).clamp(0.0, 1.0);
            let timing = 0.5 + player.stats.reaction / 200.0;
            let gk_positioning = 1.2;
            let pressure = 1.0 + perception.pressure_count as f32 * 0.3;

            shot_success_probability(
                player.stats.shot_accuracy,
                angle_factor,
                player.stats.balance,
                timing,
                gk_positioning,
                pressure,
            )
        }
        AiAction::Dribble => dribble_success_probability(
            player.stats.dribbling,
            perception.pressure_count,
            player.stamina,
        ),
        AiAction::Tackle => {
            let distance = (perception.ball_position - player.position).norm();
            tackle_success_probability(player.stats.strength, distance)
        }
        AiAction::Clear => 0.9,
        AiAction::HoldBall => 0.8,
        AiAction::MoveToSpace => 0.85,
    }
}

fn position_score(action: AiAction, player: &MatchPlayer, perception: &PerceptionData) -> f32 {
    let goal_distance = perception.distance_to_goal(player.position);
    let own_goal_distance = (perception.own_goal - player.position).norm();

    match action {
        AiAction::Shoot => (1.0 - goal_distance / SHOOTING_RANGE).clamp(0.0, 1.0),
        AiAction::Pass => {
            if perception.passing_lanes.is_empty() {
                0.0
            } else {
                1.0 - perception.best_lane().map(|l| l.interception_risk).unwrap_or(1.0)
            }
        }
        AiAction::Dribble => {
            let space = (perception.open_space - player.position).norm();
            (space / 12.0).clamp(0.0, 1.0) * (1.0 - perception.pressure_count as f32 * 0.2).max(0.0)
        }
        // Clearing is most valuable deep in the defensive third.
        AiAction::Clear => (1.0 - own_goal_distance / 35.0).clamp(0.0, 1.0),
        AiAction::Tackle => {
            let distance = (perception.ball_position - player.position).norm();
            (1.0 - distance / 15.0).clamp(0.0, 1.0)
        }
        AiAction::HoldBall => 0.4,
        AiAction::MoveToSpace => 0.6,
    }
}

fn tactical_need(
    action: AiAction,
    player: &MatchPlayer,
    perception: &PerceptionData,
    game_state: GameStateView,
) -> f32 {
    let own_goal_distance = (perception.own_goal - player.position).norm();
    let in_defensive_third = own_goal_distance < 35.0;
    let goal_distance = perception.distance_to_goal(player.position);
    let in_attacking_third = goal_distance < 35.0;

    match action {
        AiAction::Shoot => {
            if in_attacking_third {
                0.9
            } else {
                0.1
            }
        }
        AiAction::Pass => 0.7,
        AiAction::Dribble => {
            if in_defensive_third {
                0.2
            } else {
                0.6
            }
        }
        AiAction::Clear => {
            if in_defensive_third && perception.pressure_count > 0 {
                0.95
            } else {
                0.05
            }
        }
        AiAction::Tackle => {
            // A proven finisher on the ball has to be closed down, and
            // doubly so near the defended goal.
            let urgency = 0.3 + game_state.carrier_threat * 0.4;
            if in_defensive_third {
                (urgency + 0.3).min(1.0)
            } else {
                urgency
            }
        }
        AiAction::HoldBall => {
            if perception.pressure_count == 0 {
                0.5
            } else {
                0.15
            }
        }
        AiAction::MoveToSpace => 0.55,
    }
}

/// How acceptable this action's inherent risk is right now. Appetite
/// grows when trailing late and shrinks when leading; the score rewards
/// actions whose risk profile matches the appetite.
pub fn risk_factor(
    action: AiAction,
    personality: &AIPersonality,
    margin: i16,
    elapsed_fraction: f32,
) -> f32 {
    let mut appetite = 0.5 + personality.risk_tolerance * 0.2;

    if margin > 0 {
        appetite -= 0.2;
    } else if margin < 0 && elapsed_fraction > 0.75 {
        appetite += 0.3;
    }
    let appetite = appetite.clamp(0.0, 1.0);

    let action_risk = match action {
        AiAction::Shoot => 0.8,
        AiAction::Dribble => 0.6,
        AiAction::Tackle => 0.5,
        AiAction::Pass => 0.4,
        AiAction::MoveToSpace => 0.3,
        AiAction::HoldBall => 0.2,
        AiAction::Clear => 0.1,
    };

    1.0 - (action_risk - appetite).abs()
}

fn fatigue_modifier(action: AiAction, player: &MatchPlayer) -> f32 {
    let stamina = player.stamina / 100.0;

    match action {
        AiAction::Dribble | AiAction::Tackle | AiAction::MoveToSpace => stamina,
        AiAction::HoldBall | AiAction::Clear => 1.0 - stamina * 0.3,
        _ => 0.7 + stamina * 0.3,
    }
}

fn build_intent(
    action: AiAction,
    player: &MatchPlayer,
    perception: &PerceptionData,
    rng: &mut impl Rng,
) -> AiIntent {
    match action {
        AiAction::Shoot => {
            // Aim inside a post rather than dead center.
            let aim_y = perception.opponent_goal.y + rng.random_range(-2.8..2.8);
            let target = Vector3::new(perception.opponent_goal.x, aim_y, 0.8);
            AiIntent {
                player_id: player.id,
                action,
                direction: target - player.position,
                power: 0.85 + rng.random_range(0.0..0.15),
                move_target: None,
            }
        }
        AiAction::Pass => {
            let (direction, power) = match perception.best_lane() {
                Some(lane) => (
                    lane.target - player.position,
                    (lane.distance / SAFE_PASS_RADIUS).clamp(0.3, 1.0),
                ),
                None => (perception.opponent_goal - player.position, 0.6),
            };
            AiIntent {
                player_id: player.id,
                action,
                direction,
                power,
                move_target: None,
            }
        }
        AiAction::Dribble => AiIntent {
            player_id: player.id,
            action,
            direction: perception.open_space - player.position,
            power: 0.7,
            move_target: Some(perception.open_space),
        },
        AiAction::Clear => {
            // Up the pitch and wide, away from the defended goal.
            let upfield = player.team.attack_direction();
            let side = if player.position.y > perception.own_goal.y {
                1.0
            } else {
                -1.0
            };
            AiIntent {
                player_id: player.id,
                action,
                direction: Vector3::new(upfield, side * 0.5, 0.3),
                power: 1.0,
                move_target: None,
            }
        }
        AiAction::Tackle => AiIntent {
            player_id: player.id,
            action,
            direction: perception.ball_position - player.position,
            power: 0.8,
            move_target: Some(perception.ball_position),
        },
        AiAction::HoldBall => AiIntent {
            player_id: player.id,
            action,
            direction: Vector3::zeros(),
            power: 0.0,
            move_target: None,
        },
        AiAction::MoveToSpace => AiIntent {
            player_id: player.id,
            action,
            direction: perception.open_space - player.position,
            power: 0.6,
            move_target: Some(perception.open_space),
        },
    }
}
