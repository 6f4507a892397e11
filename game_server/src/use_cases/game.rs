use super::types::{GameBroadcast, GameEvent, PlayerSnapshot, RoundSummary, WorldUpdate};
use crate::domain::systems::flight;
use crate::domain::{
    Phase, PlayerRegistry, RoundState, RoundTimings, ScoringMode, Transition, WorldTuning,
};
use rand::RngCore;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info};

/// Knobs for one game world.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Fixed interval of the fine (physics/broadcast) tick.
    pub tick_interval: Duration,
    /// Fine ticks per coarse timer step; the coarse timer never runs on its own clock.
    pub ticks_per_second: u32,
    pub timings: RoundTimings,
    pub tuning: WorldTuning,
    pub scoring: ScoringMode,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_nanos(1_000_000_000 / 60),
            ticks_per_second: 60,
            timings: RoundTimings::default(),
            tuning: WorldTuning::default(),
            scoring: ScoringMode::default(),
        }
    }
}

/// All mutable game state, owned by the world task and passed to every handler.
pub struct GameContext<R> {
    settings: GameSettings,
    round: RoundState,
    registry: PlayerRegistry,
    rng: R,
    tick: u64,
}

impl<R: RngCore> GameContext<R> {
    pub fn new(settings: GameSettings, mut rng: R) -> Self {
        let seed = rng.next_u32();
        Self {
            round: RoundState::new(settings.timings, seed),
            settings,
            registry: PlayerRegistry::new(),
            rng,
            tick: 0,
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn summary(&self) -> RoundSummary {
        RoundSummary {
            phase: self.round.phase(),
            time_remaining: self.round.time_remaining(),
            leaderboard_seconds: self.round.timings().leaderboard_seconds,
            seed: self.round.seed(),
            world_offset: self.round.world_offset(),
        }
    }

    /// Applies one connection event. Events for players that are gone are ignored.
    pub fn handle_event(&mut self, event: GameEvent, out: &mut Vec<GameBroadcast>) {
        let phase = self.round.phase();
        let tuning = self.settings.tuning;
        let (player_id, result) = match event {
            GameEvent::Join {
                player_id,
                username,
                reply,
            } => {
                let joined = self
                    .registry
                    .join(player_id, &username, &tuning)
                    .map(|p| p.username.as_str().to_string());
                match joined {
                    Ok(username) => {
                        if reply.send(Ok(self.summary())).is_err() {
                            // Connection went away before the ack; never keep an orphan.
                            self.registry.leave(player_id);
                            debug!(player_id, "join ack undeliverable; player dropped");
                            return;
                        }
                        info!(player_id, %username, players = self.registry.len(), "player joined");
                        out.push(GameBroadcast::PlayerJoined {
                            player_id,
                            username,
                        });
                    }
                    Err(e) => {
                        debug!(player_id, error = ?e, "join rejected");
                        let _ = reply.send(Err(e));
                    }
                }
                return;
            }
            GameEvent::Leave { player_id } => {
                if self.registry.leave(player_id).is_some() {
                    info!(player_id, players = self.registry.len(), "player left");
                }
                return;
            }
            GameEvent::Jump { player_id } => (
                player_id,
                self.registry.apply_jump(player_id, phase, &tuning),
            ),
            GameEvent::Dead { player_id } => (player_id, self.registry.mark_dead(player_id)),
            GameEvent::Restart { player_id } => {
                (player_id, self.registry.restart(player_id, phase, &tuning))
            }
            GameEvent::ReportScore { player_id, score } => {
                if self.settings.scoring == ScoringMode::Distance {
                    debug!(player_id, score, "score report ignored; server computes score");
                    return;
                }
                (
                    player_id,
                    self.registry.report_score(player_id, score, phase),
                )
            }
        };

        if let Err(e) = result {
            debug!(player_id, error = ?e, "event ignored");
        }
    }

    /// One fine tick: physics, the coarse timer on every `ticks_per_second`-th tick, and the
    /// snapshot broadcast (sent in every phase).
    pub fn step(&mut self, out: &mut Vec<GameBroadcast>) {
        self.tick += 1;

        if self.round.phase() == Phase::Playing {
            self.round.advance_scroll(self.settings.tuning.scroll_speed);
            for player in self.registry.iter_mut() {
                if flight::tick_player(player, &self.settings.tuning, self.settings.scoring) {
                    debug!(player_id = player.id, y = player.y, "player left the viewport");
                }
            }
        }

        if self.tick % u64::from(self.settings.ticks_per_second.max(1)) == 0 {
            self.second_tick(out);
        }

        out.push(GameBroadcast::Update(self.snapshot()));
    }

    fn second_tick(&mut self, out: &mut Vec<GameBroadcast>) {
        let has_players = !self.registry.is_empty();
        let Some(transition) = self.round.on_second(has_players, &mut self.rng) else {
            return;
        };

        match transition {
            Transition::Started => {
                info!(
                    seed = self.round.seed(),
                    phase = self.round.phase().as_str(),
                    "round started"
                );
                out.push(GameBroadcast::GameStart);
            }
            Transition::Ended => {
                let leaderboard = self.registry.leaderboard();
                info!(
                    players = leaderboard.len(),
                    top_score = ?leaderboard.first().map(|e| e.score),
                    phase = self.round.phase().as_str(),
                    "round ended"
                );
                out.push(GameBroadcast::ShowLeaderboard(leaderboard));
            }
            Transition::NewRound { seed } => {
                self.registry.reset_all(&self.settings.tuning);
                info!(seed, phase = self.round.phase().as_str(), "new round");
                out.push(GameBroadcast::NewRound { seed });
            }
        }
    }

    pub fn snapshot(&self) -> WorldUpdate {
        WorldUpdate {
            tick: self.tick,
            players: self
                .registry
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id,
                    username: p.username.as_str().to_string(),
                    x: p.x,
                    y: p.y,
                    alive: p.alive,
                    score: p.score,
                    distance: p.distance,
                })
                .collect(),
            round: self.summary(),
        }
    }
}

/// Authoritative world loop.
///
/// Connection events and the fixed tick are multiplexed on this single task, so every
/// handler runs to completion before the next one and the state needs no locking.
pub async fn world_task<R>(
    mut input_rx: mpsc::Receiver<GameEvent>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    round_tx: watch::Sender<RoundSummary>,
    mut game: GameContext<R>,
) where
    R: RngCore + Send + 'static,
{
    let mut interval = tokio::time::interval(game.settings().tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut out: Vec<GameBroadcast> = Vec::new();

    info!(seed = game.round().seed(), "world task started");

    loop {
        tokio::select! {
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!("input channel closed; world task exiting");
                    break;
                };
                let handled = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    game.handle_event(event, &mut out)
                }));
                if handled.is_err() {
                    error!("event handler panicked; continuing");
                }
            }
            _ = interval.tick() => {
                let stepped = std::panic::catch_unwind(AssertUnwindSafe(|| game.step(&mut out)));
                if stepped.is_err() {
                    error!(tick = game.tick(), "world step panicked; continuing with next tick");
                }

                let summary = game.summary();
                round_tx.send_if_modified(|current| {
                    if *current != summary {
                        *current = summary;
                        true
                    } else {
                        false
                    }
                });
            }
        }

        // Fire-and-forget; no receivers just means nobody is connected.
        for msg in out.drain(..) {
            let _ = broadcast_tx.send(msg);
        }
    }
}
