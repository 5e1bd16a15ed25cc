pub mod trajectory;

pub use trajectory::{GoalCrossing, goal_line_crossing, predict};

use crate::context::Team;
use crate::physics::{MatchField, PlayerStats};
use log::debug;
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;
use std::collections::HashMap;

/// Lateral speed of a committed dive.
const DIVE_SPEED: f32 = 7.0;
/// Everything a keeper can reach without leaving their feet.
const STANDING_REACH: f32 = 0.8;
const ARM_REACH: f32 = 1.1;
const BASE_REACTION: f32 = 0.16;
/// Keepers hold position slightly off their line.
const LINE_OFFSET: f32 = 0.8;
const RECOVERY_TIME: f32 = 0.5;
/// Catches are only attempted below this ball speed.
const CATCH_SPEED_LIMIT: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    Catch,
    Punch,
    ParryWide,
    DiveLeft,
    DiveRight,
    DiveCenter,
    Stay,
}

impl SaveAction {
    /// Commitment window. The keeper cannot re-decide until it elapses.
    pub fn duration(self) -> f32 {
        match self {
            SaveAction::Catch => 0.3,
            SaveAction::Punch => 0.4,
            SaveAction::ParryWide => 0.5,
            SaveAction::DiveCenter => 0.5,
            SaveAction::DiveLeft | SaveAction::DiveRight => 0.7,
            SaveAction::Stay => 0.8,
        }
    }

    /// Fraction of full dive speed spent on this action.
    fn power(self) -> f32 {
        match self {
            SaveAction::DiveLeft | SaveAction::DiveRight => 1.0,
            SaveAction::ParryWide => 0.9,
            SaveAction::Punch | SaveAction::DiveCenter => 0.6,
            SaveAction::Catch => 0.4,
            SaveAction::Stay => 0.0,
        }
    }

    fn reach(self) -> f32 {
        match self {
            SaveAction::Catch => STANDING_REACH,
            SaveAction::Stay => STANDING_REACH,
            _ => ARM_REACH,
        }
    }
}

/// Time from the shot being struck to the keeper starting to move.
/// Scales inversely with the reaction rating and degrades with fatigue;
/// close fast shots leave less composure and lengthen it further.
pub fn reaction_time(stats: &PlayerStats, stamina: f32, distance: f32, shot_speed: f32) -> f32 {
    let rating = stats.reaction.clamp(1.0, 100.0);
    let fatigue = 2.0 - stamina.clamp(0.0, 100.0) / 100.0;
    let distance_mod = (1.2 - distance / 60.0).clamp(0.8, 1.2);
    let speed_mod = (shot_speed / 20.0).clamp(0.8, 1.3);

    BASE_REACTION * (100.0 / rating) * fatigue * distance_mod * speed_mod
}

/// Pick the save for a shot arriving at `lateral` meters from the keeper
/// at `height`, or `Stay` when the ball cannot be reached in time.
pub fn choose_action(
    lateral: f32,
    height: f32,
    shot_speed: f32,
    time_available: f32,
    reaction: f32,
) -> SaveAction {
    let travel = lateral.abs().max(0.0);
    let acting_time = time_available - reaction;

    if acting_time <= 0.0 {
        return SaveAction::Stay;
    }

    let reachable = travel <= DIVE_SPEED * acting_time + ARM_REACH;
    if !reachable {
        return SaveAction::Stay;
    }

    if travel <= STANDING_REACH {
        if height > 1.9 || shot_speed > CATCH_SPEED_LIMIT * 1.5 {
            return SaveAction::Punch;
        }
        if shot_speed < CATCH_SPEED_LIMIT && height < 1.9 {
            return SaveAction::Catch;
        }
        return SaveAction::DiveCenter;
    }

    // Barely reachable balls get pushed wide instead of held.
    if travel > DIVE_SPEED * acting_time * 0.8 {
        return SaveAction::ParryWide;
    }

    if lateral < 0.0 {
        SaveAction::DiveLeft
    } else {
        SaveAction::DiveRight
    }
}

enum KeeperPhase {
    Idle,
    Reacting {
        remaining: f32,
        action: SaveAction,
        target: Vector3<f32>,
    },
    Executing {
        remaining: f32,
        action: SaveAction,
        target: Vector3<f32>,
    },
    Recovering {
        remaining: f32,
    },
}

/// Save state machine for both goalkeepers. Driven every physics step;
/// the keeper commits to one action per shot and cannot cancel it.
pub struct GoalkeeperSystem {
    phases: HashMap<u32, KeeperPhase>,
}

impl GoalkeeperSystem {
    pub fn new() -> Self {
        GoalkeeperSystem {
            phases: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.phases.clear();
    }

    /// `dive_bias` is the learned anticipation shift, in meters along y,
    /// for the side the current opponents favor.
    pub fn tick(&mut self, field: &mut MatchField, dive_bias: f32, dt: f32, rng: &mut impl Rng) {
        for team in [Team::Home, Team::Away] {
            let Some(keeper_id) = field.goalkeeper(team).map(|k| k.id) else {
                continue;
            };

            let phase = self.phases.remove(&keeper_id).unwrap_or(KeeperPhase::Idle);
            let next = match phase {
                KeeperPhase::Idle => {
                    Self::hold_position(field, keeper_id, team);
                    Self::assess_shot(field, keeper_id, team, dive_bias, rng)
                        .unwrap_or(KeeperPhase::Idle)
                }
                KeeperPhase::Reacting {
                    remaining,
                    action,
                    target,
                } => {
                    let remaining = remaining - dt;
                    if remaining <= 0.0 {
                        debug!("keeper {keeper_id} commits to {action:?}");
                        KeeperPhase::Executing {
                            remaining: action.duration(),
                            action,
                            target,
                        }
                    } else {
                        KeeperPhase::Reacting {
                            remaining,
                            action,
                            target,
                        }
                    }
                }
                KeeperPhase::Executing {
                    remaining,
                    action,
                    target,
                } => {
                    let remaining = remaining - dt;
                    Self::move_toward(field, keeper_id, target, action.power(), dt);

                    if Self::try_resolve_save(field, keeper_id, team, action) || remaining <= 0.0 {
                        KeeperPhase::Recovering {
                            remaining: RECOVERY_TIME,
                        }
                    } else {
                        KeeperPhase::Executing {
                            remaining,
                            action,
                            target,
                        }
                    }
                }
                KeeperPhase::Recovering { remaining } => {
                    let remaining = remaining - dt;
                    if remaining <= 0.0 {
                        KeeperPhase::Idle
                    } else {
                        KeeperPhase::Recovering { remaining }
                    }
                }
            };

            self.phases.insert(keeper_id, next);
        }
    }

    /// Idle positioning: shadow the ball laterally along the goal mouth.
    fn hold_position(field: &mut MatchField, keeper_id: u32, team: Team) {
        let goal = team.defended_goal();
        let ball_y = field.ball.position.y;

        if let Some(keeper) = field.player_mut(keeper_id) {
            let hold_x = goal.x + team.attack_direction() * LINE_OFFSET;
            let half_mouth = crate::constants::GOAL_WIDTH / 2.0;
            let hold_y = ball_y.clamp(goal.y - half_mouth, goal.y + half_mouth);

            let target = Vector3::new(hold_x, hold_y, 0.0);
            let offset = target - keeper.position;
            let distance = offset.norm();
            if distance > 0.1 {
                keeper.intent.direction = offset / distance;
                keeper.intent.power = (distance / 3.0).clamp(0.2, 0.8);
                keeper.intent.sprinting = false;
            } else {
                keeper.intent.direction = Vector3::zeros();
                keeper.intent.power = 0.0;
            }
        }
    }

    fn assess_shot(
        field: &MatchField,
        keeper_id: u32,
        team: Team,
        dive_bias: f32,
        rng: &mut impl Rng,
    ) -> Option<KeeperPhase> {
        let ball = &field.ball;
        if ball.owner.is_some() || ball.last_touch_team == Some(team) {
            return None;
        }

        let crossing = goal_line_crossing(ball, team)?;
        if !crossing.on_target {
            return None;
        }

        let keeper = field.player(keeper_id)?;
        let shot_speed = ball.velocity.norm();
        let distance = (ball.position - keeper.position).norm();
        let reaction = reaction_time(&keeper.stats, keeper.stamina, distance, shot_speed);

        // Learned anticipation pulls the read toward the favored side,
        // with a little residual uncertainty.
        let anticipated_y =
            crossing.position.y + dive_bias + rng.random_range(-0.2..0.2);
        let lateral = anticipated_y - keeper.position.y;

        let action = choose_action(
            lateral,
            crossing.position.z,
            shot_speed,
            crossing.time,
            reaction,
        );

        let target = Vector3::new(keeper.position.x, anticipated_y, 0.0);
        Some(KeeperPhase::Reacting {
            remaining: reaction,
            action,
            target,
        })
    }

    fn move_toward(
        field: &mut MatchField,
        keeper_id: u32,
        target: Vector3<f32>,
        power: f32,
        dt: f32,
    ) {
        if let Some(keeper) = field.player_mut(keeper_id) {
            let offset = Vector3::new(0.0, target.y - keeper.position.y, 0.0);
            let distance = offset.norm();
            if distance > 0.05 && power > 0.0 {
                let step = (DIVE_SPEED * power * dt).min(distance);
                keeper.position += offset / distance * step;
                keeper.velocity = offset / distance * DIVE_SPEED * power;
            } else {
                keeper.velocity = Vector3::zeros();
            }
        }
    }

    /// Apply the save outcome once the ball is inside reach.
    fn try_resolve_save(
        field: &mut MatchField,
        keeper_id: u32,
        team: Team,
        action: SaveAction,
    ) -> bool {
        let keeper_position = match field.player(keeper_id) {
            Some(k) => k.position,
            None => return false,
        };

        let hands = keeper_position + Vector3::new(0.0, 0.0, 1.0);
        if (field.ball.position - hands).norm() > action.reach() {
            return false;
        }

        let upfield = team.attack_direction();
        match action {
            SaveAction::Catch => {
                field.ball.owner = Some(keeper_id);
                field.ball.velocity = Vector3::zeros();
                field.ball.spin = Vector3::zeros();
                field.ball.position = keeper_position + Vector3::new(upfield * 0.6, 0.0, 0.9);
            }
            SaveAction::Punch => {
                field.ball.velocity = Vector3::new(upfield * 10.0, 0.0, 6.0);
                field.ball.touch(keeper_id, team);
            }
            SaveAction::ParryWide => {
                let side = if keeper_position.y > crate::constants::FIELD_WIDTH / 2.0 {
                    1.0
                } else {
                    -1.0
                };
                field.ball.velocity = Vector3::new(upfield * 2.0, side * 9.0, 2.0);
                field.ball.touch(keeper_id, team);
            }
            SaveAction::DiveLeft | SaveAction::DiveRight | SaveAction::DiveCenter => {
                // Strong shots bounce off the body; soft ones stick.
                if field.ball.velocity.norm() < CATCH_SPEED_LIMIT {
                    field.ball.owner = Some(keeper_id);
                    field.ball.velocity = Vector3::zeros();
                    field.ball.spin = Vector3::zeros();
                } else {
                    field.ball.velocity = Vector3::new(
                        upfield * 4.0,
                        field.ball.velocity.y * -0.3,
                        2.5,
                    );
                }
                field.ball.touch(keeper_id, team);
            }
            SaveAction::Stay => return false,
        }

        debug!("keeper {keeper_id} resolves {action:?}");
        true
    }
}

impl Default for GoalkeeperSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FIELD_WIDTH;
    use crate::context::Team;
    use crate::physics::{MatchPlayer, PlayerRole};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn keeper_stats(reaction: f32) -> PlayerStats {
        PlayerStats {
            reaction,
            ..PlayerStats::default()
        }
    }

    #[test]
    fn sharper_keepers_react_faster() {
        let quick = reaction_time(&keeper_stats(90.0), 100.0, 15.0, 20.0);
        let slow = reaction_time(&keeper_stats(40.0), 100.0, 15.0, 20.0);

        assert!(quick < slow);
    }

    #[test]
    fn fatigue_slows_reactions() {
        let fresh = reaction_time(&keeper_stats(70.0), 100.0, 15.0, 20.0);
        let tired = reaction_time(&keeper_stats(70.0), 30.0, 15.0, 20.0);

        assert!(tired > fresh);
    }

    #[test]
    fn unreachable_shot_means_stay() {
        // 6 m to travel with 0.3 s of acting time cannot be covered at
        // dive speed.
        let action = choose_action(6.0, 1.0, 25.0, 0.4, 0.1);
        assert_eq!(action, SaveAction::Stay);
    }

    #[test]
    fn slow_central_ball_is_caught() {
        let action = choose_action(0.3, 1.0, 8.0, 1.0, 0.2);
        assert_eq!(action, SaveAction::Catch);
    }

    #[test]
    fn high_central_ball_is_punched() {
        let action = choose_action(0.2, 2.1, 15.0, 1.0, 0.2);
        assert_eq!(action, SaveAction::Punch);
    }

    #[test]
    fn dive_side_follows_the_ball() {
        let left = choose_action(-2.0, 1.0, 15.0, 1.5, 0.2);
        let right = choose_action(2.0, 1.0, 15.0, 1.5, 0.2);

        assert_eq!(left, SaveAction::DiveLeft);
        assert_eq!(right, SaveAction::DiveRight);
    }

    #[test]
    fn keeper_engages_an_on_target_shot() {
        let keeper = MatchPlayer::new(
            1,
            Team::Home,
            PlayerRole::Goalkeeper,
            Vector3::new(0.8, FIELD_WIDTH / 2.0, 0.0),
            keeper_stats(80.0),
        );
        let mut field = MatchField::new(vec![keeper]);
        field.ball.position = Vector3::new(14.0, FIELD_WIDTH / 2.0, 0.4);
        field.ball.velocity = Vector3::new(-18.0, 0.0, 0.5);
        field.ball.last_touch_team = Some(Team::Away);

        let mut system = GoalkeeperSystem::new();
        let mut rng = StdRng::seed_from_u64(7);
        system.tick(&mut field, 0.0, 1.0 / 60.0, &mut rng);

        assert!(matches!(
            system.phases.get(&1),
            Some(KeeperPhase::Reacting { .. })
        ));
    }
}
