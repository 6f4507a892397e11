// Player registry: connection identity -> bird state.

use super::errors::RegistryError;
use super::round::Phase;
use super::tuning::WorldTuning;
use std::collections::BTreeMap;

pub type PlayerId = u64;

pub const MIN_USERNAME_CHARS: usize = 2;
pub const MAX_USERNAME_CHARS: usize = 24;

/// Validated display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// Trims, strips control characters and truncates; rejects names that end up too short.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .take(MAX_USERNAME_CHARS)
            .collect();
        let cleaned = cleaned.trim_end().to_string();
        if cleaned.chars().count() < MIN_USERNAME_CHARS {
            return Err(RegistryError::InvalidUsername);
        }
        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: Username,
    pub x: i32,
    pub y: i32,
    pub alive: bool,
    pub score: u32,
    /// Distance scrolled while alive since the last spawn.
    pub distance: u64,
}

impl Player {
    fn spawn(id: PlayerId, username: Username, tuning: &WorldTuning) -> Self {
        Self {
            id,
            username,
            x: tuning.spawn_x,
            y: tuning.spawn_y,
            alive: true,
            score: 0,
            distance: 0,
        }
    }

    /// Back to the spawn point mid-round. The score stands until the bird earns a new one.
    fn respawn(&mut self, tuning: &WorldTuning) {
        self.x = tuning.spawn_x;
        self.y = tuning.spawn_y;
        self.alive = true;
        self.distance = 0;
    }

    /// Fresh start for a new round.
    fn reset(&mut self, tuning: &WorldTuning) {
        self.respawn(tuning);
        self.score = 0;
    }
}

/// Single row of a ranked leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub username: String,
    pub score: u32,
}

/// Owns every joined player. Keys are connection ids, so iteration order is join order.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(
        &mut self,
        id: PlayerId,
        raw_username: &str,
        tuning: &WorldTuning,
    ) -> Result<&Player, RegistryError> {
        let username = Username::parse(raw_username)?;
        if self.players.contains_key(&id) {
            return Err(RegistryError::AlreadyJoined);
        }
        Ok(self
            .players
            .entry(id)
            .or_insert_with(|| Player::spawn(id, username, tuning)))
    }

    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Instantaneous upward displacement.
    pub fn apply_jump(
        &mut self,
        id: PlayerId,
        phase: Phase,
        tuning: &WorldTuning,
    ) -> Result<(), RegistryError> {
        let player = self.players.get_mut(&id).ok_or(RegistryError::UnknownPlayer)?;
        if !player.alive {
            return Err(RegistryError::PlayerDead);
        }
        if phase != Phase::Playing {
            return Err(RegistryError::NotPlaying);
        }
        player.y -= tuning.jump_impulse;
        Ok(())
    }

    /// Idempotent.
    pub fn mark_dead(&mut self, id: PlayerId) -> Result<(), RegistryError> {
        let player = self.players.get_mut(&id).ok_or(RegistryError::UnknownPlayer)?;
        player.alive = false;
        Ok(())
    }

    /// Per-player respawn while the rest of the round carries on.
    pub fn restart(
        &mut self,
        id: PlayerId,
        phase: Phase,
        tuning: &WorldTuning,
    ) -> Result<(), RegistryError> {
        let player = self.players.get_mut(&id).ok_or(RegistryError::UnknownPlayer)?;
        if player.alive {
            return Err(RegistryError::PlayerAlive);
        }
        if phase != Phase::Playing {
            return Err(RegistryError::NotPlaying);
        }
        player.respawn(tuning);
        Ok(())
    }

    /// Overwrites the score with a client-reported value.
    pub fn report_score(
        &mut self,
        id: PlayerId,
        score: u32,
        phase: Phase,
    ) -> Result<(), RegistryError> {
        let player = self.players.get_mut(&id).ok_or(RegistryError::UnknownPlayer)?;
        if phase != Phase::Playing {
            return Err(RegistryError::NotPlaying);
        }
        player.score = score;
        Ok(())
    }

    /// Respawns everyone for a fresh round.
    pub fn reset_all(&mut self, tuning: &WorldTuning) {
        for player in self.players.values_mut() {
            player.reset(tuning);
        }
    }

    /// Ranked by score, highest first; ties keep registry order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .values()
            .map(|p| LeaderboardEntry {
                player_id: p.id,
                username: p.username.as_str().to_string(),
                score: p.score,
            })
            .collect();
        // `sort_by` is stable.
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
