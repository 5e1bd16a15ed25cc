//! Deterministic football match simulation core.
//!
//! The engine runs the whole match on a fixed timestep: ball and player
//! physics, utility-driven tactical AI, goalkeeper behavior, fouls and
//! refereeing, set pieces, the match clock and control switching, plus
//! server-side packet validation and per-opponent habit learning.
//! Everything stochastic flows through one seeded generator, so a match
//! replays identically from its config.

pub mod ai;
pub mod anticheat;
pub mod constants;
pub mod context;
pub mod engine;
pub mod events;
pub mod fouls;
pub mod goalkeeper;
pub mod learning;
pub mod physics;
pub mod setpiece;
pub mod time;

pub use ai::{AiAction, AiIntent, GameStateView, TacticalAi};
pub use anticheat::{AnomalyDetection, MatchPacket, PacketAction, PacketValidator};
pub use context::{ConfigError, Difficulty, GameConfig, MatchSnapshot, Score, Team};
pub use engine::{MatchEngine, PlayerAction};
pub use events::{EventCollection, MatchEvent, RestartKind};
pub use fouls::{Card, FoulData, FoulSeverity, FoulType};
pub use learning::AdaptiveLearning;
pub use physics::{Ball, MatchField, MatchPlayer, MovementIntent, PlayerRole, PlayerStats};
pub use setpiece::SetPieceKind;
pub use time::{ControlSwitcher, MatchClock, MatchPhase};
