pub mod decision;
pub mod perception;
pub mod personality;

pub use decision::{AiAction, AiIntent, GameStateView, TacticalAi};
pub use perception::PerceptionData;
pub use personality::{AIPersonality, TacticalPreference};
