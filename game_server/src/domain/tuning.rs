/// Gameplay tuning for birds and the scrolling world.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
/// All units are integer pixels and per-tick steps so server and clients stay bit-exact.
use super::obstacles::ObstacleGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldTuning {
    /// Spawn position for fresh and respawned birds.
    pub spawn_x: i32,
    pub spawn_y: i32,

    /// Side length of the bird's square hit box.
    pub bird_size: i32,

    /// Downward displacement applied to every alive bird each tick.
    pub gravity: i32,

    /// Upward displacement applied by a single jump (no velocity model).
    pub jump_impulse: i32,

    /// World scroll per tick while a round is playing.
    pub scroll_speed: u64,

    /// Distance an alive bird must cover to earn one point.
    pub distance_per_point: u64,

    /// Shared obstacle layout parameters.
    pub obstacles: ObstacleGeometry,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            spawn_x: 50,
            spawn_y: 200,
            bird_size: 20,
            gravity: 2,
            jump_impulse: 30,
            scroll_speed: 2,
            distance_per_point: 300,
            obstacles: ObstacleGeometry::default(),
        }
    }
}

/// Who owns the score value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Server derives score from distance travelled; client reports are ignored.
    #[default]
    Distance,
    /// Clients report their own score (trusted, no anti-cheat).
    Reported,
}

impl ScoringMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "distance" => Some(ScoringMode::Distance),
            "reported" => Some(ScoringMode::Reported),
            _ => None,
        }
    }
}
