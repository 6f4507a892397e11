use crate::domain::PlayerId;
use crate::use_cases::{GameBroadcast, GameEvent, RoundSummary};
use axum::extract::ws::Utf8Bytes;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// Serialized server message shared by every connection.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    // Connection that must not receive this frame (the subject of a player_joined).
    pub skip_player: Option<PlayerId>,
    pub text: Utf8Bytes,
}

#[derive(Clone)]
pub struct AppState {
    // Inputs flowing from the network into the game loop.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Broadcasts produced by the game loop (domain structs).
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
    // Serialized broadcasts, shared across all connections.
    pub frames_tx: broadcast::Sender<OutboundFrame>,
    // Latest serialized update for lag recovery.
    pub latest_update_tx: watch::Sender<Utf8Bytes>,
    // Current round clock (phase, timer, seed, offset).
    pub round_tx: watch::Sender<RoundSummary>,
    // How long a connection may stay open without an accepted join.
    pub join_timeout: Duration,
}
