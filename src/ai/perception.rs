use crate::ai::personality::AIPersonality;
use crate::constants::{FIELD_LENGTH, FIELD_WIDTH};
use crate::physics::{MatchField, MatchPlayer, PlayerRole};
use itertools::Itertools;
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;

/// Opponents inside this radius count as pressure on the ball carrier.
pub const PRESSURE_RADIUS: f32 = 10.0;
/// Passes inside this radius are considered safe length.
pub const SAFE_PASS_RADIUS: f32 = 30.0;
const LANE_BLOCK_RADIUS: f32 = 2.5;
/// Lanes within this angle of a learned pass habit read as telegraphed.
const HABIT_CONE: f32 = 0.5;
const HABIT_PENALTY: f32 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct NearbyPlayer {
    pub id: u32,
    pub position: Vector3<f32>,
    pub distance: f32,
    pub is_goalkeeper: bool,
}

/// One candidate pass, measured and ranked while the snapshot is built.
#[derive(Debug, Clone, Copy)]
pub struct PassingLane {
    pub teammate_id: u32,
    pub target: Vector3<f32>,
    pub distance: f32,
    /// Opponent density along the lane mapped to [0, 1].
    pub interception_risk: f32,
}

/// Ephemeral snapshot of the world as one AI player perceives it.
/// Recomputed every decision interval; positions are perturbed by the
/// perceiver's error margin so weaker difficulties literally see less
/// accurately. Never persisted across ticks.
#[derive(Debug, Clone)]
pub struct PerceptionData {
    pub ball_position: Vector3<f32>,
    pub ball_velocity: Vector3<f32>,
    pub teammates: Vec<NearbyPlayer>,
    pub opponents: Vec<NearbyPlayer>,
    /// Lanes sorted best-first by risk then length.
    pub passing_lanes: Vec<PassingLane>,
    pub open_space: Vector3<f32>,
    /// Opponents inside the pressure radius of the perceiver.
    pub pressure_count: usize,
    pub own_goal: Vector3<f32>,
    pub opponent_goal: Vector3<f32>,
    pub has_ball: bool,
}

impl PerceptionData {
    /// `habitual_pass_angle` is the perceiver's own learned pass
    /// direction, if opponents have seen enough of it to read it.
    pub fn build(
        player: &MatchPlayer,
        field: &MatchField,
        personality: &AIPersonality,
        habitual_pass_angle: Option<f32>,
        rng: &mut impl Rng,
    ) -> Self {
        let position_error = personality.position_error;
        let ball_position = perturb(field.ball.position, position_error, rng);
        let ball_velocity = field.ball.velocity;

        let mut teammates = Vec::new();
        let mut opponents = Vec::new();
        let mut pressure_count = 0;

        for other in &field.players {
            if other.id == player.id {
                continue;
            }

            let observed = perturb(other.position, position_error, rng);
            let distance = (observed - player.position).norm();
            let nearby = NearbyPlayer {
                id: other.id,
                position: observed,
                distance,
                is_goalkeeper: other.role == PlayerRole::Goalkeeper,
            };

            if other.team == player.team {
                teammates.push(nearby);
            } else {
                if distance < PRESSURE_RADIUS {
                    pressure_count += 1;
                }
                opponents.push(nearby);
            }
        }

        let passing_lanes = rank_passing_lanes(
            player,
            &teammates,
            &opponents,
            personality.prediction_depth,
            habitual_pass_angle,
        );
        let open_space = find_open_space(player, &opponents);

        PerceptionData {
            ball_position,
            ball_velocity,
            teammates,
            opponents,
            passing_lanes,
            open_space,
            pressure_count,
            own_goal: player.team.defended_goal(),
            opponent_goal: player.team.attacked_goal(),
            has_ball: field.ball.owner == Some(player.id)
                || (field.ball.last_touched_by == Some(player.id)
                    && (field.ball.position - player.position).norm() < 2.0),
        }
    }

    pub fn best_lane(&self) -> Option<&PassingLane> {
        self.passing_lanes.first()
    }

    /// Distance from the perceiver to the goal they attack.
    pub fn distance_to_goal(&self, from: Vector3<f32>) -> f32 {
        (self.opponent_goal - from).norm()
    }
}

/// Weaker difficulties literally observe positions less accurately.
fn perturb(position: Vector3<f32>, error: f32, rng: &mut impl Rng) -> Vector3<f32> {
    if error <= f32::EPSILON {
        return position;
    }

    position + Vector3::new(rng.random_range(-error..error), rng.random_range(-error..error), 0.0)
}

fn rank_passing_lanes(
    player: &MatchPlayer,
    teammates: &[NearbyPlayer],
    opponents: &[NearbyPlayer],
    prediction_depth: u8,
    habitual_pass_angle: Option<f32>,
) -> Vec<PassingLane> {
    // Deeper readers price every lane more cautiously: they assume the
    // defense anticipates as well as they do.
    let anticipation = prediction_depth as f32 / 4.0;

    teammates
        .iter()
        .filter(|mate| mate.distance > 2.0)
        .map(|mate| {
            let mut interception_risk =
                lane_interception_risk(player.position, mate.position, opponents)
                    * (1.0 + 0.3 * anticipation);

            // A pass down the carrier's known habit is the one the
            // defense is already leaning toward.
            if let Some(habit) = habitual_pass_angle {
                let lane = mate.position - player.position;
                let angle = lane.y.atan2(lane.x);
                let mut delta = (angle - habit).abs();
                if delta > std::f32::consts::PI {
                    delta = 2.0 * std::f32::consts::PI - delta;
                }
                if delta < HABIT_CONE {
                    interception_risk += HABIT_PENALTY;
                }
            }
            let interception_risk = interception_risk.clamp(0.0, 1.0);

            PassingLane {
                teammate_id: mate.id,
                target: mate.position,
                distance: mate.distance,
                interception_risk,
            }
        })
        .sorted_by(|a, b| {
            let score_a = a.interception_risk + (a.distance / SAFE_PASS_RADIUS) * 0.3;
            let score_b = b.interception_risk + (b.distance / SAFE_PASS_RADIUS) * 0.3;
            score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
        })
        .collect()
}

/// Opponent density along the pass line, as the fraction of opponents
/// whose perpendicular distance to the lane is inside the block radius.
pub fn lane_interception_risk(
    from: Vector3<f32>,
    to: Vector3<f32>,
    opponents: &[NearbyPlayer],
) -> f32 {
    let lane = to - from;
    let length = lane.norm();
    if length < f32::EPSILON {
        return 1.0;
    }
    let direction = lane / length;

    let blockers = opponents
        .iter()
        .filter(|opponent| {
            let offset = opponent.position - from;
            let along = offset.dot(&direction);
            if along <= 0.0 || along >= length {
                return false;
            }

            let projected = from + direction * along;
            (opponent.position - projected).norm() < LANE_BLOCK_RADIUS
        })
        .count();

    match blockers {
        0 => 0.0,
        1 => 0.45,
        2 => 0.75,
        _ => 0.95,
    }
}

/// Candidate open position: sample a ring of offsets around the player
/// and keep the one farthest from the nearest opponent, biased upfield.
fn find_open_space(player: &MatchPlayer, opponents: &[NearbyPlayer]) -> Vector3<f32> {
    let attack = player.team.attack_direction();
    let mut best = player.position;
    let mut best_clearance = f32::MIN;

    for step in 0..8 {
        let angle = step as f32 * std::f32::consts::FRAC_PI_4;
        let offset = Vector3::new(angle.cos() * 12.0, angle.sin() * 12.0, 0.0);
        let candidate = player.position + offset;

        if candidate.x < 0.0
            || candidate.x > FIELD_LENGTH
            || candidate.y < 0.0
            || candidate.y > FIELD_WIDTH
        {
            continue;
        }

        let clearance = opponents
            .iter()
            .map(|o| (o.position - candidate).norm())
            .fold(f32::MAX, f32::min);

        // Upfield candidates win ties.
        let scored = clearance + (candidate.x - player.position.x) * attack * 0.2;

        if scored > best_clearance {
            best_clearance = scored;
            best = candidate;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::personality::TacticalPreference;
    use crate::context::Team;
    use crate::physics::{MatchPlayer, PlayerStats};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player_at(id: u32, team: Team, x: f32, y: f32) -> MatchPlayer {
        MatchPlayer::new(
            id,
            team,
            PlayerRole::Outfield,
            Vector3::new(x, y, 0.0),
            PlayerStats::default(),
        )
    }

    fn observer(position_error: f32, prediction_depth: u8) -> AIPersonality {
        AIPersonality {
            risk_tolerance: 0.5,
            aggression: 0.5,
            positioning_iq: 0.5,
            decision_delay: 0.1,
            tactical_preference: TacticalPreference::Balanced,
            prediction_depth,
            position_error,
        }
    }

    fn nearby(id: u32, x: f32, y: f32) -> NearbyPlayer {
        NearbyPlayer {
            id,
            position: Vector3::new(x, y, 0.0),
            distance: 0.0,
            is_goalkeeper: false,
        }
    }

    #[test]
    fn open_lane_has_no_interception_risk() {
        let risk = lane_interception_risk(
            Vector3::new(40.0, 34.0, 0.0),
            Vector3::new(50.0, 34.0, 0.0),
            &[nearby(9, 45.0, 50.0)],
        );

        assert_eq!(risk, 0.0);
    }

    #[test]
    fn blocked_lane_is_risky() {
        let risk = lane_interception_risk(
            Vector3::new(40.0, 34.0, 0.0),
            Vector3::new(50.0, 34.0, 0.0),
            &[nearby(9, 45.0, 34.5)],
        );

        assert!(risk > 0.4);
    }

    #[test]
    fn lanes_rank_open_before_blocked() {
        let me = player_at(1, Team::Home, 40.0, 34.0);
        let field = MatchField::new(vec![
            me.clone(),
            player_at(2, Team::Home, 50.0, 34.0), // lane blocked below
            player_at(3, Team::Home, 40.0, 20.0), // open lane
            player_at(9, Team::Away, 45.0, 34.0), // blocker
        ]);

        let mut rng = StdRng::seed_from_u64(0);
        let perception = PerceptionData::build(&me, &field, &observer(0.0, 0), None, &mut rng);

        assert_eq!(perception.best_lane().unwrap().teammate_id, 3);
    }

    #[test]
    fn known_pass_habit_makes_the_habitual_lane_riskier() {
        let me = player_at(1, Team::Home, 40.0, 34.0);
        let field = MatchField::new(vec![
            me.clone(),
            player_at(2, Team::Home, 55.0, 34.0), // straight down the habit
            player_at(3, Team::Home, 40.0, 20.0), // off the habit line
        ]);

        let mut rng = StdRng::seed_from_u64(0);
        let fresh = PerceptionData::build(&me, &field, &observer(0.0, 0), None, &mut rng);
        let read = PerceptionData::build(&me, &field, &observer(0.0, 0), Some(0.0), &mut rng);

        let risk_of = |p: &PerceptionData, id| {
            p.passing_lanes
                .iter()
                .find(|l| l.teammate_id == id)
                .map(|l| l.interception_risk)
        };

        // Both lanes are unmarked, but the habitual one now carries a
        // surcharge and loses the ranking.
        assert_eq!(risk_of(&fresh, 2), Some(0.0));
        assert!(risk_of(&read, 2).unwrap() > risk_of(&read, 3).unwrap());
        assert_eq!(read.best_lane().unwrap().teammate_id, 3);
    }

    #[test]
    fn deeper_readers_price_lanes_more_cautiously() {
        let me = player_at(1, Team::Home, 40.0, 34.0);
        let field = MatchField::new(vec![
            me.clone(),
            player_at(2, Team::Home, 50.0, 34.0),
            player_at(9, Team::Away, 45.0, 34.5), // blocker on the lane
        ]);

        let mut rng = StdRng::seed_from_u64(0);
        let shallow = PerceptionData::build(&me, &field, &observer(0.0, 0), None, &mut rng);
        let deep = PerceptionData::build(&me, &field, &observer(0.0, 4), None, &mut rng);

        assert!(
            deep.passing_lanes[0].interception_risk > shallow.passing_lanes[0].interception_risk
        );
    }

    #[test]
    fn pressure_counts_close_opponents_only() {
        let me = player_at(1, Team::Home, 40.0, 34.0);
        let field = MatchField::new(vec![
            me.clone(),
            player_at(9, Team::Away, 45.0, 34.0),
            player_at(10, Team::Away, 90.0, 34.0),
        ]);

        let mut rng = StdRng::seed_from_u64(0);
        let perception = PerceptionData::build(&me, &field, &observer(0.0, 0), None, &mut rng);

        assert_eq!(perception.pressure_count, 1);
    }

    #[test]
    fn position_error_perturbs_observation() {
        let me = player_at(1, Team::Home, 40.0, 34.0);
        let field = MatchField::new(vec![me.clone(), player_at(9, Team::Away, 45.0, 34.0)]);

        let mut rng = StdRng::seed_from_u64(0);
        let exact = PerceptionData::build(&me, &field, &observer(0.0, 0), None, &mut rng);
        let fuzzy = PerceptionData::build(&me, &field, &observer(3.0, 0), None, &mut rng);

        assert_eq!(exact.opponents[0].position, Vector3::new(45.0, 34.0, 0.0));
        assert_ne!(fuzzy.opponents[0].position, Vector3::new(45.0, 34.0, 0.0));
    }
}
