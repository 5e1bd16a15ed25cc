pub mod actions;
pub mod ball;
pub mod collision;
pub mod player;
pub mod validator;

pub use ball::{Ball, BoundaryOutcome};
pub use collision::CollisionData;
pub use player::{BodyType, MatchPlayer, MovementIntent, PlayerRole, PlayerStats};

use crate::context::Team;

/// Everything that lives on the pitch. Owned and mutated exclusively by
/// the physics step; every other system reads a consistent view within
/// the same tick and emits intents instead of writing here.
pub struct MatchField {
    pub ball: Ball,
    pub players: Vec<MatchPlayer>,
}

impl MatchField {
    pub fn new(players: Vec<MatchPlayer>) -> Self {
        MatchField {
            ball: Ball::at_kickoff(),
            players,
        }
    }

    pub fn player(&self, id: u32) -> Option<&MatchPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: u32) -> Option<&mut MatchPlayer> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn team_players(&self, team: Team) -> impl Iterator<Item = &MatchPlayer> {
        self.players.iter().filter(move |p| p.team == team)
    }

    pub fn goalkeeper(&self, team: Team) -> Option<&MatchPlayer> {
        self.players
            .iter()
            .find(|p| p.team == team && p.role == PlayerRole::Goalkeeper)
    }

    pub fn controlled_player(&self, team: Team) -> Option<&MatchPlayer> {
        self.players
            .iter()
            .find(|p| p.team == team && p.is_controlled)
    }

    pub fn reset_positions(&mut self, kickoff_positions: &[(u32, nalgebra::Vector3<f32>)]) {
        for (id, position) in kickoff_positions {
            if let Some(player) = self.player_mut(*id) {
                player.position = *position;
                player.velocity = nalgebra::Vector3::zeros();
                player.intent = MovementIntent::default();
            }
        }
        self.ball.reset_to_kickoff();
    }
}
