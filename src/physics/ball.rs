use crate::constants::{
    AIR_DENSITY, BALL_CROSS_SECTION, BALL_DRAG_COEFFICIENT, BALL_MASS, BALL_SPEED_SANITY,
    FIELD_LENGTH, FIELD_WIDTH, GOAL_HEIGHT, GOAL_WIDTH, GRAVITY, GROUND_FRICTION,
    GROUND_RESTITUTION, MAGNUS_COEFFICIENT, SPIN_DECAY,
};
use crate::context::Team;
use nalgebra::Vector3;

pub struct Ball {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub spin: Vector3<f32>,

    /// Player currently dribbling the ball, if any.
    pub owner: Option<u32>,
    pub last_touched_by: Option<u32>,
    pub last_touch_team: Option<Team>,
}

/// What the boundary check concluded for this step. Goal and out-of-play
/// results are returned to the engine, which turns them into events and a
/// dead ball; the ball itself only corrects its own state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryOutcome {
    Goal { conceding: Team },
    ThrowIn { position: Vector3<f32> },
    Corner { position: Vector3<f32> },
    GoalKick { defending: Team },
}

impl Ball {
    pub fn at_kickoff() -> Self {
        Ball {
            position: Vector3::new(FIELD_LENGTH / 2.0, FIELD_WIDTH / 2.0, 0.0),
            velocity: Vector3::zeros(),
            spin: Vector3::zeros(),
            owner: None,
            last_touched_by: None,
            last_touch_team: None,
        }
    }

    /// One fixed step of ball flight: gravity, quadratic drag, Magnus
    /// lift, integration, then ground contact and spin decay.
    pub fn step(&mut self, dt: f32) {
        const STOPPING_THRESHOLD: f32 = 0.1;

        let speed = self.velocity.norm();

        if speed > STOPPING_THRESHOLD || self.position.z > 0.0 {
            let drag_force = -0.5
                * AIR_DENSITY
                * speed
                * BALL_DRAG_COEFFICIENT
                * BALL_CROSS_SECTION
                * self.velocity;

            let magnus_force = MAGNUS_COEFFICIENT * self.spin.cross(&self.velocity);

            let gravity_force = Vector3::new(0.0, 0.0, -BALL_MASS * GRAVITY);

            let acceleration = (drag_force + magnus_force + gravity_force) / BALL_MASS;
            self.velocity += acceleration * dt;

            self.position += self.velocity * dt;
        } else {
            self.velocity = Vector3::zeros();
            self.position.z = 0.0;
        }

        self.resolve_ground_contact(dt);

        self.spin *= SPIN_DECAY;

        // Post-integration sanity bound; the periodic validator is the
        // backstop for anything that slips past this.
        let speed = self.velocity.norm();
        if speed > BALL_SPEED_SANITY {
            self.velocity *= BALL_SPEED_SANITY / speed;
        }
    }

    fn resolve_ground_contact(&mut self, dt: f32) {
        if self.position.z <= 0.0 {
            self.position.z = 0.0;

            if self.velocity.z < 0.0 {
                self.velocity.z = -self.velocity.z * GROUND_RESTITUTION;

                if self.velocity.z < 0.5 {
                    self.velocity.z = 0.0;
                }
            }

            // Rolling friction on the horizontal components only.
            let horizontal = Vector3::new(self.velocity.x, self.velocity.y, 0.0);
            let horizontal_speed = horizontal.norm();
            if horizontal_speed > f32::EPSILON {
                let decel = GROUND_FRICTION * GRAVITY * dt;
                let new_speed = (horizontal_speed - decel).max(0.0);
                let scaled = horizontal * (new_speed / horizontal_speed);
                self.velocity.x = scaled.x;
                self.velocity.y = scaled.y;
            }
        }
    }

    /// Boundary handling: touchlines reflect the ball back in play while
    /// signalling a throw-in; goal lines either score or classify a
    /// corner/goal kick from the last touch.
    pub fn check_bounds(&mut self) -> Option<BoundaryOutcome> {
        // Touchlines (y). Reflect with damping so the ball stays playable
        // while the dead-ball restart is organized.
        if self.position.y < 0.0 || self.position.y > FIELD_WIDTH {
            let position = self.position;
            self.position.y = self.position.y.clamp(0.0, FIELD_WIDTH);
            self.velocity.y = -self.velocity.y * 0.5;

            return Some(BoundaryOutcome::ThrowIn { position });
        }

        // Goal lines (x).
        let crossed = if self.position.x < 0.0 {
            Some(Team::Home)
        } else if self.position.x > FIELD_LENGTH {
            Some(Team::Away)
        } else {
            None
        };

        let conceding = crossed?;

        if self.is_in_goal_mouth() {
            return Some(BoundaryOutcome::Goal { conceding });
        }

        let position = self.position;
        self.position.x = self.position.x.clamp(0.0, FIELD_LENGTH);
        self.velocity = Vector3::zeros();

        // Last touch decides: defenders concede a corner, attackers a
        // goal kick. Unknown touch defaults to a goal kick.
        match self.last_touch_team {
            Some(team) if team == conceding => Some(BoundaryOutcome::Corner { position }),
            _ => Some(BoundaryOutcome::GoalKick {
                defending: conceding,
            }),
        }
    }

    /// Point-in-goal-mouth test: within half the goal width of the goal
    /// center and under the crossbar.
    fn is_in_goal_mouth(&self) -> bool {
        let center_y = FIELD_WIDTH / 2.0;

        (self.position.y - center_y).abs() <= GOAL_WIDTH / 2.0 && self.position.z <= GOAL_HEIGHT
    }

    pub fn reset_to_kickoff(&mut self) {
        self.position = Vector3::new(FIELD_LENGTH / 2.0, FIELD_WIDTH / 2.0, 0.0);
        self.velocity = Vector3::zeros();
        self.spin = Vector3::zeros();
        self.owner = None;
        self.last_touched_by = None;
        self.last_touch_team = None;
    }

    pub fn place_at(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.velocity = Vector3::zeros();
        self.spin = Vector3::zeros();
        self.owner = None;
    }

    pub fn touch(&mut self, player_id: u32, team: Team) {
        self.last_touched_by = Some(player_id);
        self.last_touch_team = Some(team);
    }
}
