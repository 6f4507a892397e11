// Client-side replica of the round: replays obstacles from (seed, offset) and reports
// collisions and scores upward.

use crate::domain::{Obstacle, Phase, Rect, WorldTuning};
use crate::interface_adapters::protocol::{
    ClientMessage, GameStateDto, LeaderboardEntryDto, PlayerDto, ServerMessage, UpdateStateDto,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Local view of the game built purely from server broadcasts.
///
/// Obstacle geometry never comes from the server; it is recomputed from the broadcast seed and
/// world offset on every snapshot with the same generator the server uses.
#[derive(Debug)]
pub struct ClientMirror {
    tuning: WorldTuning,
    report_scores: bool,

    player_id: Option<String>,
    phase: Phase,
    seed: u32,
    world_offset: u64,
    time_remaining: u32,
    players: BTreeMap<String, PlayerDto>,
    obstacles: Vec<Obstacle>,
    leaderboard: Vec<LeaderboardEntryDto>,

    // Set once `dead` was sent; cleared when the server shows the bird dead.
    dead_reported: bool,
    // Columns already behind the bird when the current life started; None while dead.
    life_origin: Option<u64>,
    // Columns cleared in earlier lives of this round.
    banked: u32,
    reported_score: u32,
}

impl ClientMirror {
    pub fn new(tuning: WorldTuning, report_scores: bool) -> Self {
        Self {
            tuning,
            report_scores,
            player_id: None,
            phase: Phase::Waiting,
            seed: 0,
            world_offset: 0,
            time_remaining: 0,
            players: BTreeMap::new(),
            obstacles: Vec::new(),
            leaderboard: Vec::new(),
            dead_reported: false,
            life_origin: None,
            banked: 0,
            reported_score: 0,
        }
    }

    /// Folds one server message into the mirror and returns the messages to send back.
    pub fn apply(&mut self, msg: ServerMessage) -> Vec<ClientMessage> {
        let mut out = Vec::new();
        match msg {
            ServerMessage::Identity(identity) => {
                self.player_id = Some(identity.player_id);
            }
            ServerMessage::GameState(state) => {
                self.apply_game_state(state);
                self.refresh_obstacles();
            }
            ServerMessage::GameStart => {
                self.phase = Phase::Playing;
                self.world_offset = 0;
                self.restart_scoring();
                self.refresh_obstacles();
            }
            ServerMessage::Update(update) => {
                self.players = update.players;
                self.apply_update_state(update.game_state);
                self.refresh_obstacles();
                self.evaluate(&mut out);
            }
            ServerMessage::ShowLeaderboard(entries) => {
                self.phase = Phase::Leaderboard;
                self.leaderboard = entries;
            }
            ServerMessage::NewRound(round) => {
                self.phase = Phase::Playing;
                self.seed = round.seed;
                self.world_offset = 0;
                self.leaderboard.clear();
                self.restart_scoring();
                self.refresh_obstacles();
            }
            ServerMessage::PlayerJoined(joined) => {
                debug!(id = %joined.id, username = %joined.username, "player joined");
            }
            ServerMessage::JoinRejected(rejected) => {
                debug!(reason = %rejected.reason, "join rejected");
            }
        }
        out
    }

    fn apply_game_state(&mut self, state: GameStateDto) {
        let seed_changed = state.seed != self.seed;
        self.phase = state.status.into();
        self.time_remaining = state.time_remaining;
        self.seed = state.seed;
        self.world_offset = state.world_offset;
        if seed_changed {
            self.restart_scoring();
        }
    }

    fn apply_update_state(&mut self, state: UpdateStateDto) {
        // A snapshot with a new seed means a `new_round` was lost to lag.
        let seed_changed = state.seed != self.seed;
        self.phase = state.status.into();
        self.time_remaining = state.time_remaining;
        self.seed = state.seed;
        self.world_offset = state.world_offset;
        if seed_changed {
            self.restart_scoring();
        }
    }

    fn refresh_obstacles(&mut self) {
        self.obstacles = self
            .tuning
            .obstacles
            .window(self.seed, self.world_offset, self.bird_x());
    }

    fn columns_passed(&self) -> u64 {
        self.tuning
            .obstacles
            .slots_passed(self.world_offset, self.bird_x())
    }

    /// New round: the score starts over.
    fn restart_scoring(&mut self) {
        self.banked = 0;
        self.reported_score = 0;
        if self.life_origin.is_some() {
            self.life_origin = Some(self.columns_passed());
        }
    }

    fn close_life(&mut self) {
        if self.life_origin.is_some() {
            self.banked = self.local_score();
            self.life_origin = None;
        }
    }

    fn bird_x(&self) -> i32 {
        self.local_player()
            .map(|p| p.x)
            .unwrap_or(self.tuning.spawn_x)
    }

    fn evaluate(&mut self, out: &mut Vec<ClientMessage>) {
        let Some(me) = self.local_player().cloned() else {
            return;
        };

        if !me.alive {
            self.close_life();
            self.dead_reported = false;
            return;
        }
        if self.dead_reported {
            return;
        }
        if self.life_origin.is_none() {
            // Respawned: columns behind the spawn point do not count again.
            self.life_origin = Some(self.columns_passed());
        }
        if self.phase != Phase::Playing {
            return;
        }

        let bird = Rect::new(me.x, me.y, self.tuning.bird_size, self.tuning.bird_size);
        let geometry = &self.tuning.obstacles;
        let hit = geometry.out_of_bounds(&bird)
            || self.obstacles.iter().any(|o| o.collides(&bird, geometry));
        if hit {
            self.close_life();
            self.dead_reported = true;
            out.push(ClientMessage::Dead);
            return;
        }

        if self.report_scores {
            let score = self.local_score();
            if score > self.reported_score {
                self.reported_score = score;
                out.push(ClientMessage::UpdateScore(score));
            }
        }
    }

    /// Columns cleared this round; a restart keeps what earlier lives earned.
    pub fn local_score(&self) -> u32 {
        let current = self
            .life_origin
            .map(|origin| self.columns_passed().saturating_sub(origin) as u32)
            .unwrap_or(0);
        self.banked + current
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn local_player(&self) -> Option<&PlayerDto> {
        self.player_id.as_ref().and_then(|id| self.players.get(id))
    }

    pub fn players(&self) -> &BTreeMap<String, PlayerDto> {
        &self.players
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn world_offset(&self) -> u64 {
        self.world_offset
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntryDto] {
        &self.leaderboard
    }

    pub fn tuning(&self) -> &WorldTuning {
        &self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::protocol::{
        IdentityDto, NewRoundDto, PhaseDto, UpdateDto,
    };

    fn joined(report_scores: bool) -> ClientMirror {
        let mut mirror = ClientMirror::new(WorldTuning::default(), report_scores);
        mirror.apply(ServerMessage::Identity(IdentityDto {
            player_id: "1".into(),
        }));
        mirror.apply(ServerMessage::GameState(GameStateDto {
            status: PhaseDto::Waiting,
            time_remaining: 300,
            leaderboard_time: 20,
            seed: 42,
            world_offset: 0,
        }));
        mirror
    }

    fn update(seed: u32, world_offset: u64, y: i32, alive: bool) -> ServerMessage {
        let mut players = BTreeMap::new();
        players.insert(
            "1".to_string(),
            PlayerDto {
                username: "alice".into(),
                x: 50,
                y,
                alive,
                score: 0,
                distance: world_offset,
            },
        );
        ServerMessage::Update(UpdateDto {
            players,
            game_state: UpdateStateDto {
                status: PhaseDto::Playing,
                time_remaining: 200,
                world_offset,
                seed,
            },
        })
    }

    // Height inside the gap of the column closest to the bird.
    fn safe_y(mirror: &ClientMirror) -> i32 {
        mirror
            .obstacles()
            .first()
            .map(|o| o.gap_top + 10)
            .unwrap_or(200)
    }

    #[test]
    fn obstacles_match_the_server_generator() {
        let mut mirror = joined(false);
        mirror.apply(update(42, 760, 200, true));
        let expected = WorldTuning::default().obstacles.window(42, 760, 50);
        assert_eq!(mirror.obstacles(), expected.as_slice());
        assert_eq!(mirror.obstacles()[0].gap_top, 193);
    }

    #[test]
    fn reports_dead_once_on_column_hit() {
        let mut mirror = joined(false);
        // Slot 0 sits at screen x 40 at offset 760; gap_top 193 so y 100 hits the top pipe.
        assert_eq!(mirror.apply(update(42, 760, 100, true)), vec![ClientMessage::Dead]);
        assert!(mirror.apply(update(42, 762, 102, true)).is_empty());

        // Server confirms the death, then a restart brings the bird back.
        assert!(mirror.apply(update(42, 764, 104, false)).is_empty());
        assert_eq!(mirror.apply(update(42, 766, 100, true)), vec![ClientMessage::Dead]);
    }

    #[test]
    fn bird_inside_the_gap_survives() {
        let mut mirror = joined(false);
        mirror.apply(update(42, 760, 200, true));
        let y = safe_y(&mirror);
        assert!(mirror.apply(update(42, 762, y, true)).is_empty());
    }

    #[test]
    fn reports_dead_when_touching_the_floor() {
        let mut mirror = joined(false);
        assert_eq!(mirror.apply(update(42, 10, 461, true)), vec![ClientMessage::Dead]);
    }

    #[test]
    fn nothing_is_reported_outside_playing() {
        let mut mirror = joined(false);
        let mut msg = update(42, 760, 100, true);
        if let ServerMessage::Update(update) = &mut msg {
            update.game_state.status = PhaseDto::Leaderboard;
        }
        assert!(mirror.apply(msg).is_empty());
    }

    #[test]
    fn score_reports_once_per_cleared_column() {
        let mut mirror = joined(true);
        assert!(mirror.apply(update(42, 700, 200, true)).is_empty());

        mirror.apply(update(42, 800, 200, true));
        let y = safe_y(&mirror);
        assert_eq!(
            mirror.apply(update(42, 802, y, true)),
            vec![ClientMessage::UpdateScore(1)]
        );
        assert!(mirror.apply(update(42, 804, y, true)).is_empty());
        assert_eq!(mirror.local_score(), 1);
    }

    #[test]
    fn restart_keeps_columns_from_the_previous_life() {
        let mut mirror = joined(true);
        mirror.apply(update(42, 700, 200, true));
        mirror.apply(update(42, 800, 200, true));
        let y = safe_y(&mirror);
        assert_eq!(
            mirror.apply(update(42, 802, y, true)),
            vec![ClientMessage::UpdateScore(1)]
        );

        // Dead, then respawned further along the same round.
        mirror.apply(update(42, 804, y, false));
        assert!(mirror.apply(update(42, 900, 200, true)).is_empty());
        assert_eq!(mirror.local_score(), 1);

        assert_eq!(
            mirror.apply(update(42, 1102, 200, true)),
            vec![ClientMessage::UpdateScore(2)]
        );
    }

    #[test]
    fn snapshot_updates_clock_and_roster() {
        let mut mirror = joined(false);
        assert_eq!(mirror.player_id(), Some("1"));
        assert_eq!(mirror.time_remaining(), 300);
        assert!(mirror.players().is_empty());

        mirror.apply(update(42, 10, 200, true));
        assert_eq!(mirror.time_remaining(), 200);
        assert_eq!(mirror.players().len(), 1);
        assert_eq!(mirror.local_player().map(|p| p.username.as_str()), Some("alice"));
    }

    #[test]
    fn new_round_resets_seed_and_score() {
        let mut mirror = joined(true);
        mirror.apply(update(42, 2000, 200, true));
        mirror.apply(ServerMessage::NewRound(NewRoundDto { seed: 7 }));
        assert_eq!(mirror.seed(), 7);
        assert_eq!(mirror.world_offset(), 0);
        assert_eq!(mirror.phase(), Phase::Playing);
        assert_eq!(mirror.local_score(), 0);
        assert_eq!(mirror.obstacles()[0].gap_top, WorldTuning::default().obstacles.gap_top(7, 0));
    }

    #[test]
    fn seed_change_in_snapshot_resynchronizes() {
        let mut mirror = joined(true);
        mirror.apply(update(42, 2000, 200, true));
        // The new_round frame was lost; the next snapshot already carries the new seed.
        mirror.apply(update(9, 4, 200, true));
        assert_eq!(mirror.seed(), 9);
        assert_eq!(mirror.local_score(), 0);

        mirror.apply(update(9, 800, 200, true));
        let y = safe_y(&mirror);
        assert_eq!(
            mirror.apply(update(9, 802, y, true)),
            vec![ClientMessage::UpdateScore(1)]
        );
    }

    #[test]
    fn leaderboard_is_kept_until_next_round() {
        let mut mirror = joined(false);
        mirror.apply(ServerMessage::ShowLeaderboard(vec![LeaderboardEntryDto {
            username: "alice".into(),
            score: 3,
        }]));
        assert_eq!(mirror.phase(), Phase::Leaderboard);
        assert_eq!(mirror.leaderboard().len(), 1);
        mirror.apply(ServerMessage::NewRound(NewRoundDto { seed: 5 }));
        assert!(mirror.leaderboard().is_empty());
    }
}
