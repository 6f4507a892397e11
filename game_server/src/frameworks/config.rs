use crate::domain::{RoundTimings, ScoringMode, WorldTuning};
use crate::use_cases::GameSettings;
use std::{env, net::IpAddr, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_host() -> IpAddr {
    env::var("GAME_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub fn round_seconds() -> u32 {
    env::var("ROUND_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_ROUND_SECONDS)
}

pub fn leaderboard_seconds() -> u32 {
    env::var("LEADERBOARD_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_LEADERBOARD_SECONDS)
}

pub fn scoring_mode() -> ScoringMode {
    match env::var("SCORING_MODE") {
        Ok(raw) => ScoringMode::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(value = %raw, "unknown SCORING_MODE; using distance");
            ScoringMode::Distance
        }),
        Err(_) => ScoringMode::default(),
    }
}

pub fn join_timeout() -> Duration {
    let secs = env::var("JOIN_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(300);
    Duration::from_secs(secs)
}

pub fn game_settings() -> GameSettings {
    GameSettings {
        tick_interval: TICK_INTERVAL,
        ticks_per_second: TICKS_PER_SECOND,
        timings: RoundTimings {
            round_seconds: round_seconds(),
            leaderboard_seconds: leaderboard_seconds(),
        },
        tuning: WorldTuning::default(),
        scoring: scoring_mode(),
    }
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);
pub const TICKS_PER_SECOND: u32 = 60;

pub const DEFAULT_ROUND_SECONDS: u32 = 300;
pub const DEFAULT_LEADERBOARD_SECONDS: u32 = 20;

// Bot client.

pub fn bot_server_url() -> String {
    env::var("BOT_SERVER_URL").unwrap_or_else(|_| "ws://127.0.0.1:3000/ws".to_string())
}

pub fn bot_username() -> String {
    env::var("BOT_USERNAME").unwrap_or_else(|_| "bot".to_string())
}

pub fn bot_report_scores() -> bool {
    matches!(
        env::var("BOT_REPORT_SCORES").as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}
