use crate::constants::{BALL_RADIUS, BALL_RESTITUTION, PLAYER_RADIUS, PLAYER_RESTITUTION};
use crate::physics::ball::Ball;
use crate::physics::player::MatchPlayer;
use itertools::Itertools;
use nalgebra::Vector3;

/// Spin picked up from the tangential component of the touching player's
/// velocity. Kept small so Magnus bends trajectories instead of steering.
const SPIN_TRANSFER: f32 = 2.0;

/// Player-player contacts below this closing speed are ordinary jostling
/// and never reach the referee.
const FOUL_FORWARD_SPEED: f32 = 2.0;

/// Transient result of one pairwise contact, consumed by the foul system
/// within the same tick.
#[derive(Debug, Clone, Copy)]
pub struct CollisionData {
    pub offender: u32,
    pub victim: u32,
    pub contact_point: Vector3<f32>,
    pub relative_velocity: f32,
    pub contact_angle: f32,
    pub ball_contacted_first: bool,
    pub arm_contact: bool,
}

/// Resolve ball-vs-player contacts for this step. The dribbling owner is
/// exempt: possession is a soft constraint, not a collision.
pub fn resolve_ball_contacts(ball: &mut Ball, players: &[MatchPlayer]) {
    if ball.owner.is_some() {
        return;
    }

    let contact_radius = PLAYER_RADIUS + BALL_RADIUS;

    for player in players {
        let offset = Vector3::new(
            ball.position.x - player.position.x,
            ball.position.y - player.position.y,
            0.0,
        );
        let distance = offset.norm();

        if distance >= contact_radius || ball.position.z > 2.3 {
            continue;
        }

        let normal = if distance > f32::EPSILON {
            offset / distance
        } else {
            Vector3::new(1.0, 0.0, 0.0)
        };

        // Separate the ball out of the player volume.
        let penetration = contact_radius - distance;
        ball.position += normal * penetration;

        // Impulse along the normal with ball restitution.
        let relative = ball.velocity - player.velocity;
        let closing = relative.dot(&normal);
        if closing < 0.0 {
            ball.velocity -= normal * closing * (1.0 + BALL_RESTITUTION);
        }

        // Tangential player movement grazes spin onto the ball.
        let tangential = player.velocity - normal * player.velocity.dot(&normal);
        ball.spin += Vector3::new(0.0, 0.0, normal.x * tangential.y - normal.y * tangential.x)
            * SPIN_TRANSFER;

        ball.touch(player.id, player.team);
    }
}

/// Resolve player-player contacts: separate, exchange impulse with the
/// lower human restitution, and forward high-energy opposing-team contacts
/// to the foul system.
pub fn resolve_player_contacts(
    players: &mut [MatchPlayer],
    ball: &Ball,
) -> Vec<CollisionData> {
    let mut fouls = Vec::new();
    let contact_radius = PLAYER_RADIUS * 2.0;

    let pairs: Vec<(usize, usize)> = (0..players.len()).tuple_combinations().collect();

    for (a, b) in pairs {
        let offset = players[b].position - players[a].position;
        let distance = offset.norm();

        if distance >= contact_radius {
            continue;
        }

        let normal = if distance > f32::EPSILON {
            offset / distance
        } else {
            Vector3::new(1.0, 0.0, 0.0)
        };

        let penetration = contact_radius - distance;
        let half = normal * (penetration / 2.0);
        players[a].position -= half;
        players[b].position += half;

        let relative = players[b].velocity - players[a].velocity;
        let closing = relative.dot(&normal);

        if closing < 0.0 {
            let impulse = normal * closing * (1.0 + PLAYER_RESTITUTION) / 2.0;
            players[a].velocity += impulse;
            players[b].velocity -= impulse;
        }

        let closing_speed = closing.abs();
        if closing_speed < FOUL_FORWARD_SPEED || players[a].team == players[b].team {
            continue;
        }

        // The faster mover into the contact is treated as the offender.
        let a_into = players[a].velocity.dot(&normal).max(0.0);
        let b_into = (-players[b].velocity.dot(&normal)).max(0.0);
        let (offender, victim) = if a_into >= b_into { (a, b) } else { (b, a) };

        let contact_point = players[a].position + normal * PLAYER_RADIUS;
        let contact_angle = contact_angle(&players[offender], &players[victim]);

        let ball_distance = (ball.position - contact_point).norm();
        let ball_contacted_first =
            ball.last_touched_by == Some(players[offender].id) && ball_distance < 2.0;

        // Physics cannot see limbs; a ball striking the upper body volume
        // is what the referee reads as a possible handball.
        let arm_contact = ball.position.z > 1.1 && ball_distance < PLAYER_RADIUS + BALL_RADIUS;

        fouls.push(CollisionData {
            offender: players[offender].id,
            victim: players[victim].id,
            contact_point,
            relative_velocity: closing_speed,
            contact_angle,
            ball_contacted_first,
            arm_contact,
        });
    }

    fouls
}

/// Angle between the offender's approach and the victim's facing; a wide
/// angle reads as a challenge from the side or behind.
fn contact_angle(offender: &MatchPlayer, victim: &MatchPlayer) -> f32 {
    let approach = victim.position - offender.position;
    if approach.norm() < f32::EPSILON {
        return 0.0;
    }

    let approach_heading = approach.y.atan2(approach.x);
    let mut angle = (approach_heading - victim.heading).abs();
    if angle > std::f32::consts::PI {
        angle = 2.0 * std::f32::consts::PI - angle;
    }

    angle
}
