// Use-case level inputs/outputs for the game loop.

use crate::domain::registry::LeaderboardEntry;
use crate::domain::{Phase, PlayerId, RegistryError};
use tokio::sync::oneshot;

/// Reply channel for a join request; carries the round snapshot the client starts from.
pub type JoinReply = oneshot::Sender<Result<RoundSummary, RegistryError>>;

#[derive(Debug)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
        username: String,
        reply: JoinReply,
    },
    Leave {
        player_id: PlayerId,
    },
    Jump {
        player_id: PlayerId,
    },
    Dead {
        player_id: PlayerId,
    },
    Restart {
        player_id: PlayerId,
    },
    ReportScore {
        player_id: PlayerId,
        score: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub phase: Phase,
    pub time_remaining: u32,
    pub leaderboard_seconds: u32,
    pub seed: u32,
    pub world_offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub username: String,
    pub x: i32,
    pub y: i32,
    pub alive: bool,
    pub score: u32,
    pub distance: u64,
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    pub round: RoundSummary,
}

/// Everything the world task fans out to connected clients.
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    Update(WorldUpdate),
    GameStart,
    ShowLeaderboard(Vec<LeaderboardEntry>),
    NewRound { seed: u32 },
    /// Delivered to everyone except the joining player.
    PlayerJoined {
        player_id: PlayerId,
        username: String,
    },
}
