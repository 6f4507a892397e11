// Wire protocol DTOs and conversions for public game server messages.
//
// Every frame is a JSON text message shaped as `{"type": "<event>", "data": <payload>}`;
// payload-less events carry only the tag. Payload fields are camelCase for browser clients.

use crate::domain::Phase;
use crate::domain::registry::LeaderboardEntry;
use crate::use_cases::{GameBroadcast, PlayerSnapshot, RoundSummary, WorldUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity(IdentityDto),
    // Round snapshot acknowledging a successful join.
    GameState(GameStateDto),
    // Waiting -> Playing.
    GameStart,
    // Per-tick snapshot of every player and the round clock.
    Update(UpdateDto),
    // Ranked results at the end of a round.
    ShowLeaderboard(Vec<LeaderboardEntryDto>),
    // Leaderboard -> Playing with the new obstacle seed.
    NewRound(NewRoundDto),
    // Another player entered the game.
    PlayerJoined(PlayerJoinedDto),
    // Join refused by input validation; the client may retry.
    JoinRejected(JoinRejectedDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    // Handshake carrying the display name.
    #[serde(alias = "join_game")]
    Join(String),
    Jump,
    // Client-detected collision (trusted).
    Dead,
    // Respawn after dying, mid-round.
    Restart,
    // Client-reported score (trusted, only used in reported scoring mode).
    UpdateScore(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseDto {
    Waiting,
    Playing,
    Leaderboard,
}

impl From<Phase> for PhaseDto {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Waiting => PhaseDto::Waiting,
            Phase::Playing => PhaseDto::Playing,
            Phase::Leaderboard => PhaseDto::Leaderboard,
        }
    }
}

impl From<PhaseDto> for Phase {
    fn from(phase: PhaseDto) -> Self {
        match phase {
            PhaseDto::Waiting => Phase::Waiting,
            PhaseDto::Playing => Phase::Playing,
            PhaseDto::Leaderboard => Phase::Leaderboard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDto {
    pub player_id: String,
}

/// Full round snapshot; also served by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateDto {
    pub status: PhaseDto,
    pub time_remaining: u32,
    pub leaderboard_time: u32,
    pub seed: u32,
    pub world_offset: u64,
}

impl From<RoundSummary> for GameStateDto {
    fn from(summary: RoundSummary) -> Self {
        Self {
            status: summary.phase.into(),
            time_remaining: summary.time_remaining,
            leaderboard_time: summary.leaderboard_seconds,
            seed: summary.seed,
            world_offset: summary.world_offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDto {
    /// Keyed by player id.
    pub players: BTreeMap<String, PlayerDto>,
    pub game_state: UpdateStateDto,
}

impl From<WorldUpdate> for UpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            players: update
                .players
                .iter()
                .map(|p| (p.id.to_string(), PlayerDto::from(p)))
                .collect(),
            game_state: update.round.into(),
        }
    }
}

/// Round clock carried by every tick. Includes the seed so a client that missed a
/// `new_round` resynchronizes on the next snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStateDto {
    pub status: PhaseDto,
    pub time_remaining: u32,
    pub world_offset: u64,
    pub seed: u32,
}

impl From<RoundSummary> for UpdateStateDto {
    fn from(summary: RoundSummary) -> Self {
        Self {
            status: summary.phase.into(),
            time_remaining: summary.time_remaining,
            world_offset: summary.world_offset,
            seed: summary.seed,
        }
    }
}

/// Flattened player state for wire transmission in updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDto {
    pub username: String,
    pub x: i32,
    pub y: i32,
    pub alive: bool,
    pub score: u32,
    pub distance: u64,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            username: player.username.clone(),
            x: player.x,
            y: player.y,
            alive: player.alive,
            score: player.score,
            distance: player.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntryDto {
    pub username: String,
    pub score: u32,
}

impl From<LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            username: entry.username,
            score: entry.score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoundDto {
    pub seed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoinedDto {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRejectedDto {
    pub reason: String,
}

impl From<GameBroadcast> for ServerMessage {
    fn from(broadcast: GameBroadcast) -> Self {
        match broadcast {
            GameBroadcast::Update(update) => ServerMessage::Update(update.into()),
            GameBroadcast::GameStart => ServerMessage::GameStart,
            GameBroadcast::ShowLeaderboard(entries) => ServerMessage::ShowLeaderboard(
                entries.into_iter().map(LeaderboardEntryDto::from).collect(),
            ),
            GameBroadcast::NewRound { seed } => ServerMessage::NewRound(NewRoundDto { seed }),
            GameBroadcast::PlayerJoined {
                player_id,
                username,
            } => ServerMessage::PlayerJoined(PlayerJoinedDto {
                id: player_id.to_string(),
                username,
            }),
        }
    }
}
