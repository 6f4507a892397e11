// Client side of the protocol: the local game mirror and a headless bot built on it.

pub mod bot;
pub mod mirror;

pub use bot::{Autopilot, BotConfig, BotError, run_bot};
pub use mirror::ClientMirror;
