use crate::constants::{
    FIELD_LENGTH, FIELD_WIDTH, GRAVITY, PENALTY_SPOT_DISTANCE, WALL_DISTANCE,
};
use crate::context::Team;
use crate::events::{EventCollection, MatchEvent};
use crate::physics::{MatchField, PlayerRole};
use log::debug;
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;
use serde::{Deserialize, Serialize};

/// Spacing between wall members' centers.
const WALL_SPACING: f32 = 0.6;
/// How long the taker sets the ball before the automatic kick.
const SETUP_DELAY: f32 = 0.8;
/// Full allowance before the restart force-completes.
const EXECUTION_WINDOW: f32 = 2.5;
/// Aim scatter ceiling for penalties, radians.
const PENALTY_MAX_DEVIATION: f32 = 0.12;
/// A launch this flat can be caught by the wall.
const WALL_BLOCK_LOFT: f32 = 0.25;
const WALL_BLOCK_RADIUS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetPieceKind {
    FreeKick,
    Penalty,
    Corner,
    ThrowIn,
    GoalKick,
}

impl SetPieceKind {
    /// Hard ceiling on the restart's launch speed.
    pub fn max_speed(self) -> f32 {
        match self {
            SetPieceKind::FreeKick => 25.0,
            SetPieceKind::Penalty => 20.0,
            SetPieceKind::Corner => 20.0,
            SetPieceKind::ThrowIn => 15.0,
            SetPieceKind::GoalKick => 30.0,
        }
    }

    /// Highest arc the restart may reach, meters.
    pub fn max_height(self) -> f32 {
        match self {
            SetPieceKind::FreeKick => 15.0,
            SetPieceKind::Penalty => 2.4,
            SetPieceKind::Corner => 20.0,
            SetPieceKind::ThrowIn => 8.0,
            SetPieceKind::GoalKick => 25.0,
        }
    }

    fn builds_wall(self) -> bool {
        matches!(self, SetPieceKind::FreeKick)
    }
}

struct ActiveSetPiece {
    kind: SetPieceKind,
    team: Team,
    taker: u32,
    spot: Vector3<f32>,
    elapsed: f32,
    executed: bool,
    wall: Vec<u32>,
}

/// Owns every dead-ball restart from whistle to completion. While a set
/// piece is active the tactical layer is muted and only the taker acts.
pub struct SetPieceSystem {
    active: Option<ActiveSetPiece>,
}

impl SetPieceSystem {
    pub fn new() -> Self {
        SetPieceSystem { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<SetPieceKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Freeze the ball at the restart spot, hand it to the nearest
    /// eligible taker, and stand up a defensive wall when the kind calls
    /// for one. Any previously active restart is discarded.
    pub fn initiate(
        &mut self,
        kind: SetPieceKind,
        team: Team,
        hint: Vector3<f32>,
        field: &mut MatchField,
        events: &mut EventCollection,
    ) {
        let spot = restart_spot(kind, team, hint);

        let Some(taker) = Self::pick_taker(field, team, spot) else {
            return;
        };

        field.ball.place_at(spot);
        field.ball.owner = Some(taker);

        // The taker steps up behind the ball.
        let approach = team.attack_direction();
        if let Some(player) = field.player_mut(taker) {
            player.position = spot - Vector3::new(approach * 1.5, 0.0, 0.0);
            player.velocity = Vector3::zeros();
        }

        let wall = if kind.builds_wall() {
            Self::build_wall(field, team.opposite(), spot)
        } else {
            Vec::new()
        };

        debug!("{kind:?} for {team:?} at {spot:?}, taker {taker}");
        events.add(MatchEvent::SetPieceStarted { kind, taker });

        self.active = Some(ActiveSetPiece {
            kind,
            team,
            taker,
            spot,
            elapsed: 0.0,
            executed: false,
            wall,
        });
    }

    /// Advance the restart. The taker kicks automatically after the
    /// setup delay unless a controlled player already executed; the whole
    /// restart force-completes at the end of the window.
    pub fn tick(
        &mut self,
        field: &mut MatchField,
        dt: f32,
        rng: &mut impl Rng,
        events: &mut EventCollection,
    ) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        active.elapsed += dt;

        if !active.executed && active.elapsed >= SETUP_DELAY {
            let (direction, power) = auto_target(active, field, rng);
            Self::launch(active, field, direction, power, rng);
        }

        let ball_released = (field.ball.position - active.spot).norm() > 2.0;
        if active.elapsed >= EXECUTION_WINDOW || (active.executed && ball_released) {
            events.add(MatchEvent::SetPieceCompleted { kind: active.kind });
            self.active = None;
        }
    }

    /// Controlled-player execution. Returns false when no restart is
    /// waiting or the caller is not the taker.
    pub fn execute(
        &mut self,
        player_id: u32,
        direction: Vector3<f32>,
        power: f32,
        field: &mut MatchField,
        rng: &mut impl Rng,
    ) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.executed || active.taker != player_id {
            return false;
        }

        Self::launch(active, field, direction, power.clamp(0.0, 1.0), rng);
        true
    }

    fn launch(
        active: &mut ActiveSetPiece,
        field: &mut MatchField,
        direction: Vector3<f32>,
        power: f32,
        rng: &mut impl Rng,
    ) {
        let norm = direction.norm();
        if norm < f32::EPSILON {
            return;
        }
        let mut aim = direction / norm;

        if active.kind == SetPieceKind::Penalty {
            aim = apply_penalty_noise(aim, active.taker, field, power, rng);
        }

        let speed = active.kind.max_speed() * power.clamp(0.1, 1.0);
        let mut velocity = aim * speed;

        // Clamp the arc to the restart's height allowance.
        let max_vz = (2.0 * GRAVITY * active.kind.max_height()).sqrt();
        velocity.z = velocity.z.clamp(0.0, max_vz);

        if !active.wall.is_empty() && wall_intercepts(active.spot, velocity, &active.wall, field) {
            // Blocked: the ball thuds off the wall and drops.
            velocity = Vector3::new(-velocity.x * 0.2, velocity.y * 0.2, 2.0);
            debug!("free kick blocked by the wall");
        }

        field.ball.owner = None;
        field.ball.velocity = velocity;
        field.ball.touch(active.taker, active.team);
        active.executed = true;
    }

    fn pick_taker(field: &MatchField, team: Team, spot: Vector3<f32>) -> Option<u32> {
        field
            .team_players(team)
            .filter(|p| p.role == PlayerRole::Outfield)
            .min_by(|a, b| {
                let da = (a.position - spot).norm();
                let db = (b.position - spot).norm();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|p| p.id)
            .or_else(|| field.goalkeeper(team).map(|k| k.id))
    }

    /// Line up 2-5 defenders on the ball-goal line at the regulation
    /// distance, spread shoulder to shoulder.
    fn build_wall(field: &mut MatchField, defending: Team, spot: Vector3<f32>) -> Vec<u32> {
        let goal = defending.defended_goal();
        let to_goal = goal - spot;
        let goal_distance = to_goal.norm();
        if goal_distance < f32::EPSILON {
            return Vec::new();
        }
        let direction = to_goal / goal_distance;

        // More bodies the closer the kick.
        let count = if goal_distance < 20.0 {
            5
        } else if goal_distance < 30.0 {
            4
        } else if goal_distance < 40.0 {
            3
        } else {
            2
        };

        let mut candidates: Vec<(f32, u32)> = field
            .team_players(defending)
            .filter(|p| p.role == PlayerRole::Outfield)
            .map(|p| ((p.position - spot).norm(), p.id))
            .collect();
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(count);

        let center = spot + direction * WALL_DISTANCE;
        let perpendicular = Vector3::new(-direction.y, direction.x, 0.0);

        let mut wall = Vec::with_capacity(candidates.len());
        for (slot, (_, id)) in candidates.iter().enumerate() {
            let offset = (slot as f32 - (candidates.len() as f32 - 1.0) / 2.0) * WALL_SPACING;
            if let Some(player) = field.player_mut(*id) {
                player.position = center + perpendicular * offset;
                player.velocity = Vector3::zeros();
            }
            wall.push(*id);
        }

        wall
    }
}

impl Default for SetPieceSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a restart hint to the legal spot for its kind.
pub fn restart_spot(kind: SetPieceKind, team: Team, hint: Vector3<f32>) -> Vector3<f32> {
    match kind {
        SetPieceKind::ThrowIn => {
            let y = if hint.y < FIELD_WIDTH / 2.0 {
                0.0
            } else {
                FIELD_WIDTH
            };
            Vector3::new(hint.x.clamp(0.0, FIELD_LENGTH), y, 0.0)
        }
        SetPieceKind::Corner => {
            let goal_x = team.attacked_goal().x;
            let y = if hint.y < FIELD_WIDTH / 2.0 {
                0.0
            } else {
                FIELD_WIDTH
            };
            Vector3::new(goal_x, y, 0.0)
        }
        SetPieceKind::GoalKick => {
            let goal = team.defended_goal();
            Vector3::new(goal.x + team.attack_direction() * 5.5, FIELD_WIDTH / 2.0, 0.0)
        }
        SetPieceKind::Penalty => {
            let goal = team.attacked_goal();
            Vector3::new(
                goal.x - team.attack_direction() * PENALTY_SPOT_DISTANCE,
                FIELD_WIDTH / 2.0,
                0.0,
            )
        }
        SetPieceKind::FreeKick => Vector3::new(
            hint.x.clamp(0.0, FIELD_LENGTH),
            hint.y.clamp(0.0, FIELD_WIDTH),
            0.0,
        ),
    }
}

/// Penalty scatter grows with how hard the kick is hit and shrinks with
/// the taker's accuracy.
fn apply_penalty_noise(
    aim: Vector3<f32>,
    taker: u32,
    field: &MatchField,
    power: f32,
    rng: &mut impl Rng,
) -> Vector3<f32> {
    let accuracy = field
        .player(taker)
        .map(|p| p.stats.shot_accuracy)
        .unwrap_or(50.0);

    let spread = penalty_deviation(accuracy, power);
    if spread < f32::EPSILON {
        return aim;
    }

    let angle = rng.random_range(-spread..spread);
    let (sin, cos) = angle.sin_cos();
    Vector3::new(
        aim.x * cos - aim.y * sin,
        aim.x * sin + aim.y * cos,
        aim.z,
    )
}

pub fn penalty_deviation(accuracy: f32, power: f32) -> f32 {
    (1.0 - accuracy.clamp(0.0, 100.0) / 100.0)
        * (0.3 + 0.7 * power.clamp(0.0, 1.0))
        * PENALTY_MAX_DEVIATION
}

/// A flat launch whose path passes through a wall body gets blocked.
fn wall_intercepts(
    spot: Vector3<f32>,
    velocity: Vector3<f32>,
    wall: &[u32],
    field: &MatchField,
) -> bool {
    let speed = velocity.norm();
    if speed < f32::EPSILON || velocity.z / speed > WALL_BLOCK_LOFT {
        return false;
    }

    let flat = Vector3::new(velocity.x, velocity.y, 0.0);
    let flat_norm = flat.norm();
    if flat_norm < f32::EPSILON {
        return false;
    }
    let direction = flat / flat_norm;

    wall.iter()
        .filter_map(|id| field.player(*id))
        .any(|player| {
            let offset = Vector3::new(
                player.position.x - spot.x,
                player.position.y - spot.y,
                0.0,
            );
            let along = offset.dot(&direction);
            if along <= 0.0 || along > WALL_DISTANCE + 2.0 {
                return false;
            }
            (offset - direction * along).norm() < WALL_BLOCK_RADIUS
        })
}

fn auto_target(
    active: &ActiveSetPiece,
    field: &MatchField,
    rng: &mut impl Rng,
) -> (Vector3<f32>, f32) {
    let goal = active.team.attacked_goal();

    match active.kind {
        SetPieceKind::Penalty => {
            let side = if rng.random::<bool>() { 1.0 } else { -1.0 };
            let target = Vector3::new(goal.x, goal.y + side * 2.9, 0.6);
            (target - active.spot, 0.9)
        }
        SetPieceKind::FreeKick => {
            let goal_distance = (goal - active.spot).norm();
            if goal_distance < 30.0 {
                let target = Vector3::new(goal.x, goal.y + rng.random_range(-2.5..2.5), 1.8);
                (target - active.spot, 0.95)
            } else {
                // Too far to shoot: lift it into the box.
                let target = Vector3::new(
                    goal.x - active.team.attack_direction() * 12.0,
                    goal.y + rng.random_range(-8.0..8.0),
                    0.0,
                );
                let mut dir = target - active.spot;
                dir.z = dir.norm() * 0.35;
                (dir, 0.8)
            }
        }
        SetPieceKind::Corner => {
            let target = Vector3::new(
                goal.x - active.team.attack_direction() * 8.0,
                goal.y + rng.random_range(-4.0..4.0),
                0.0,
            );
            let mut dir = target - active.spot;
            dir.z = dir.norm() * 0.4;
            (dir, 0.85)
        }
        SetPieceKind::ThrowIn => {
            let target = nearest_teammate(active, field)
                .unwrap_or(active.spot + Vector3::new(active.team.attack_direction() * 8.0, 0.0, 0.0));
            let mut dir = target - active.spot;
            dir.z = 2.0;
            (dir, 0.5)
        }
        SetPieceKind::GoalKick => {
            let target = Vector3::new(
                active.spot.x + active.team.attack_direction() * 45.0,
                goal.y + rng.random_range(-15.0..15.0),
                0.0,
            );
            let mut dir = target - active.spot;
            dir.z = dir.norm() * 0.45;
            (dir, 1.0)
        }
    }
}

fn nearest_teammate(active: &ActiveSetPiece, field: &MatchField) -> Option<Vector3<f32>> {
    field
        .team_players(active.team)
        .filter(|p| p.id != active.taker)
        .min_by(|a, b| {
            let da = (a.position - active.spot).norm();
            let db = (b.position - active.spot).norm();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|p| p.position)
}
