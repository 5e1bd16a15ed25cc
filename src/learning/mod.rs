use crate::constants::{FIELD_WIDTH, GOAL_WIDTH};
use log::debug;
use std::collections::{HashMap, VecDeque};

const SHOT_HISTORY_LIMIT: usize = 10;
const PASS_HISTORY_LIMIT: usize = 20;
const OUTCOME_HISTORY_LIMIT: usize = 100;
/// Opponents not observed for this long are forgotten.
const IDLE_EVICTION_SECONDS: f64 = 600.0;
/// Largest anticipation shift a keeper earns from patterns, meters.
const MAX_DIVE_BIAS: f32 = 1.2;

/// Which side of the goal a shot targeted, from the keeper's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotCorner {
    Left,
    Center,
    Right,
}

impl ShotCorner {
    /// Classify by the lateral offset of the aim point from the goal
    /// center line.
    pub fn from_target_y(target_y: f32) -> Self {
        let offset = target_y - FIELD_WIDTH / 2.0;
        let third = GOAL_WIDTH / 6.0;
        if offset < -third {
            ShotCorner::Left
        } else if offset > third {
            ShotCorner::Right
        } else {
            ShotCorner::Center
        }
    }
}

#[derive(Debug)]
struct OpponentMemory {
    shot_corners: VecDeque<ShotCorner>,
    pass_directions: VecDeque<f32>,
    outcomes: VecDeque<bool>,
    last_seen: f64,
}

impl OpponentMemory {
    fn new(clock: f64) -> Self {
        OpponentMemory {
            shot_corners: VecDeque::new(),
            pass_directions: VecDeque::new(),
            outcomes: VecDeque::new(),
            last_seen: clock,
        }
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, limit: usize) {
    if queue.len() == limit {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Per-opponent habit memory that accumulates over a session. Keepers
/// read it as a dive bias, the tactical layer as prediction hints; it
/// never changes the rules of play, only anticipation.
#[derive(Debug, Default)]
pub struct AdaptiveLearning {
    memories: HashMap<u32, OpponentMemory>,
}

impl AdaptiveLearning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> usize {
        self.memories.len()
    }

    pub fn observe_shot(&mut self, player_id: u32, corner: ShotCorner, clock: f64) {
        let memory = self.memory(player_id, clock);
        push_bounded(&mut memory.shot_corners, corner, SHOT_HISTORY_LIMIT);
    }

    pub fn observe_pass(&mut self, player_id: u32, direction: f32, clock: f64) {
        let memory = self.memory(player_id, clock);
        push_bounded(&mut memory.pass_directions, direction, PASS_HISTORY_LIMIT);
    }

    pub fn observe_outcome(&mut self, player_id: u32, success: bool, clock: f64) {
        let memory = self.memory(player_id, clock);
        push_bounded(&mut memory.outcomes, success, OUTCOME_HISTORY_LIMIT);
    }

    /// Anticipation shift for a keeper facing this shooter: positive
    /// toward higher y. Proportional to how lopsided the corner history
    /// is; an unknown or balanced shooter earns none.
    pub fn dive_bias(&self, player_id: u32) -> f32 {
        let Some(memory) = self.memories.get(&player_id) else {
            return 0.0;
        };
        if memory.shot_corners.is_empty() {
            return 0.0;
        }

        let left = memory
            .shot_corners
            .iter()
            .filter(|c| **c == ShotCorner::Left)
            .count() as f32;
        let right = memory
            .shot_corners
            .iter()
            .filter(|c| **c == ShotCorner::Right)
            .count() as f32;
        let total = memory.shot_corners.len() as f32;

        (right - left) / total * MAX_DIVE_BIAS
    }

    /// Mean recorded pass direction, if the habit is established.
    pub fn predicted_pass_direction(&self, player_id: u32) -> Option<f32> {
        let memory = self.memories.get(&player_id)?;
        if memory.pass_directions.len() < 3 {
            return None;
        }

        let sum: f32 = memory.pass_directions.iter().sum();
        Some(sum / memory.pass_directions.len() as f32)
    }

    /// Fraction of observed actions that came off, 0.5 when unknown.
    pub fn success_tendency(&self, player_id: u32) -> f32 {
        let Some(memory) = self.memories.get(&player_id) else {
            return 0.5;
        };
        if memory.outcomes.is_empty() {
            return 0.5;
        }

        let successes = memory.outcomes.iter().filter(|s| **s).count() as f32;
        successes / memory.outcomes.len() as f32
    }

    /// Drop opponents idle longer than the eviction window.
    pub fn evict_idle(&mut self, clock: f64) {
        let before = self.memories.len();
        self.memories
            .retain(|_, memory| clock - memory.last_seen <= IDLE_EVICTION_SECONDS);
        let dropped = before - self.memories.len();
        if dropped > 0 {
            debug!("evicted {dropped} idle opponent memories");
        }
    }

    pub fn reset(&mut self) {
        self.memories.clear();
    }

    fn memory(&mut self, player_id: u32, clock: f64) -> &mut OpponentMemory {
        let memory = self
            .memories
            .entry(player_id)
            .or_insert_with(|| OpponentMemory::new(clock));
        memory.last_seen = clock;
        memory
    }
}
