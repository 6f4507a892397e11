// Headless player: a WebSocket client that drives a ClientMirror with a simple autopilot.

use crate::client::mirror::ClientMirror;
use crate::domain::{Phase, WorldTuning};
use crate::frameworks::config;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};

use futures_util::{Sink, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

// Ticks to wait after a jump before considering another one.
const JUMP_COOLDOWN_TICKS: u32 = 12;
// Ticks to wait between restart attempts while dead.
const RESTART_RETRY_TICKS: u32 = 60;
// Tolerated distance below the gap center before jumping.
const JUMP_SLACK: i32 = 20;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub server_url: String,
    pub username: String,
    pub report_scores: bool,
}

impl BotConfig {
    pub fn from_env() -> Self {
        Self {
            server_url: config::bot_server_url(),
            username: config::bot_username(),
            report_scores: config::bot_report_scores(),
        }
    }
}

#[derive(Debug)]
pub enum BotError {
    Connect(tungstenite::Error),
    Ws(tungstenite::Error),
    Serialization(serde_json::Error),
    JoinRejected(String),
}

/// Flies toward the center of the next gap and respawns after dying.
#[derive(Debug, Default)]
pub struct Autopilot {
    cooldown: u32,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per snapshot.
    pub fn decide(&mut self, mirror: &ClientMirror) -> Option<ClientMessage> {
        let me = mirror.local_player()?;
        if mirror.phase() != Phase::Playing {
            self.cooldown = 0;
            return None;
        }

        if self.cooldown > 0 {
            self.cooldown -= 1;
            return None;
        }

        if !me.alive {
            self.cooldown = RESTART_RETRY_TICKS;
            return Some(ClientMessage::Restart);
        }

        let tuning = mirror.tuning();
        let geometry = &tuning.obstacles;
        let target = mirror
            .obstacles()
            .iter()
            .find(|o| !o.passed)
            .map(|o| o.gap_top + geometry.gap_height / 2)
            .unwrap_or(geometry.viewport_height / 2);
        let center = me.y + tuning.bird_size / 2;

        if center > target + JUMP_SLACK && me.y - tuning.jump_impulse >= 0 {
            self.cooldown = JUMP_COOLDOWN_TICKS;
            Some(ClientMessage::Jump)
        } else {
            None
        }
    }
}

async fn send<S>(sink: &mut S, msg: &ClientMessage) -> Result<(), BotError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let txt = serde_json::to_string(msg).map_err(BotError::Serialization)?;
    sink.send(Message::Text(txt.into()))
        .await
        .map_err(BotError::Ws)
}

/// Connects, joins and plays until the server closes the connection.
pub async fn run_bot(config: BotConfig) -> Result<(), BotError> {
    let (ws, _response) = tokio_tungstenite::connect_async(config.server_url.as_str())
        .await
        .map_err(BotError::Connect)?;
    info!(url = %config.server_url, username = %config.username, "bot connected");

    let (mut write, mut read) = ws.split();
    send(&mut write, &ClientMessage::Join(config.username.clone())).await?;

    let mut mirror = ClientMirror::new(WorldTuning::default(), config.report_scores);
    let mut autopilot = Autopilot::new();

    while let Some(frame) = read.next().await {
        let text = match frame.map_err(BotError::Ws)? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let msg = match serde_json::from_str::<ServerMessage>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "failed to parse server message");
                continue;
            }
        };

        let is_update = match &msg {
            ServerMessage::JoinRejected(rejected) => {
                return Err(BotError::JoinRejected(rejected.reason.clone()));
            }
            ServerMessage::Identity(identity) => {
                info!(player_id = %identity.player_id, "joined");
                false
            }
            ServerMessage::ShowLeaderboard(entries) => {
                let top = entries.first().map(|e| (e.username.as_str(), e.score));
                info!(
                    entries = entries.len(),
                    connected = mirror.players().len(),
                    ?top,
                    "round over"
                );
                false
            }
            ServerMessage::NewRound(round) => {
                info!(seed = round.seed, "new round");
                false
            }
            ServerMessage::Update(_) => true,
            _ => false,
        };

        for reply in mirror.apply(msg) {
            debug!(message = ?reply, "mirror reply");
            send(&mut write, &reply).await?;
        }
        if is_update {
            if let Some(action) = autopilot.decide(&mirror) {
                send(&mut write, &action).await?;
            }
        }
    }

    info!("server closed connection");
    Ok(())
}
