// Use cases layer: application workflows for the game server.

pub mod game;
pub mod types;

pub use game::{GameContext, GameSettings, world_task};
pub use types::{GameBroadcast, GameEvent, PlayerSnapshot, RoundSummary, WorldUpdate};
