use crate::context::Team;
use crate::fouls::{Card, FoulData};
use crate::setpiece::SetPieceKind;
use crate::time::MatchPhase;
use log::debug;
use serde::{Deserialize, Serialize};

/// Restart awarded when the ball leaves the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartKind {
    ThrowIn,
    Corner,
    GoalKick,
}

/// Discrete outputs of one simulation tick, consumed by presentation,
/// commentary and moderation layers. The tick itself never mutates
/// external systems; everything observable goes through here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    Goal {
        team: Team,
        scorer: Option<u32>,
    },
    OutOfBounds {
        restart: RestartKind,
        position: [f32; 3],
        awarded_to: Team,
    },
    Foul {
        foul: FoulData,
        card: Option<Card>,
    },
    AdvantagePlayed {
        fouled_team: Team,
    },
    SetPieceStarted {
        kind: SetPieceKind,
        taker: u32,
    },
    SetPieceCompleted {
        kind: SetPieceKind,
    },
    ControlSwitched {
        player_id: u32,
    },
    PhaseChanged {
        phase: MatchPhase,
    },
}

/// Ordered event sink for a single tick, same shape as the engine's
/// collection-then-dispatch flow.
#[derive(Debug, Default)]
pub struct EventCollection {
    events: Vec<MatchEvent>,
}

impl EventCollection {
    pub fn new() -> Self {
        EventCollection { events: Vec::new() }
    }

    pub fn add(&mut self, event: MatchEvent) {
        debug!("match event: {:?}", event);
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn into_vec(self) -> Vec<MatchEvent> {
        self.events
    }

    pub fn append(&mut self, mut other: EventCollection) {
        self.events.append(&mut other.events);
    }
}
