// Round lifecycle: Waiting -> Playing -> Leaderboard -> Playing -> ...

use rand::RngCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Playing,
    Leaderboard,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Playing => "playing",
            Phase::Leaderboard => "leaderboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimings {
    /// Length of a Playing phase in seconds.
    pub round_seconds: u32,
    /// How long the leaderboard is shown between rounds.
    pub leaderboard_seconds: u32,
}

impl Default for RoundTimings {
    fn default() -> Self {
        Self {
            round_seconds: 300,
            leaderboard_seconds: 20,
        }
    }
}

/// Phase change produced by one coarse (1 Hz) timer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Waiting -> Playing with the seed already announced.
    Started,
    /// Playing -> Leaderboard.
    Ended,
    /// Leaderboard -> Playing with a freshly drawn seed.
    NewRound { seed: u32 },
}

#[derive(Debug, Clone)]
pub struct RoundState {
    phase: Phase,
    time_remaining: u32,
    seed: u32,
    world_offset: u64,
    timings: RoundTimings,
}

impl RoundState {
    pub fn new(timings: RoundTimings, seed: u32) -> Self {
        Self {
            phase: Phase::Waiting,
            time_remaining: timings.round_seconds,
            seed,
            world_offset: 0,
            timings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn world_offset(&self) -> u64 {
        self.world_offset
    }

    pub fn timings(&self) -> RoundTimings {
        self.timings
    }

    /// Advances the scroll clock; only moves while a round is playing.
    pub fn advance_scroll(&mut self, speed: u64) {
        if self.phase == Phase::Playing {
            self.world_offset += speed;
        }
    }

    /// One tick of the coarse timer. The caller applies the side effects of the transition
    /// (player resets, broadcasts).
    pub fn on_second(&mut self, has_players: bool, rng: &mut impl RngCore) -> Option<Transition> {
        match self.phase {
            Phase::Waiting => {
                if !has_players {
                    return None;
                }
                self.phase = Phase::Playing;
                self.time_remaining = self.timings.round_seconds;
                self.world_offset = 0;
                Some(Transition::Started)
            }
            Phase::Playing => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                if self.time_remaining > 0 {
                    return None;
                }
                self.phase = Phase::Leaderboard;
                self.time_remaining = self.timings.leaderboard_seconds;
                Some(Transition::Ended)
            }
            Phase::Leaderboard => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                if self.time_remaining > 0 {
                    return None;
                }
                self.phase = Phase::Playing;
                self.time_remaining = self.timings.round_seconds;
                self.world_offset = 0;
                self.seed = draw_new_seed(self.seed, rng);
                Some(Transition::NewRound { seed: self.seed })
            }
        }
    }
}

/// Uniform seed that always differs from the previous one.
pub fn draw_new_seed(previous: u32, rng: &mut impl RngCore) -> u32 {
    loop {
        let seed = rng.next_u32();
        if seed != previous {
            return seed;
        }
    }
}
