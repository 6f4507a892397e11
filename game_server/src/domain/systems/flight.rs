use crate::domain::obstacles::Rect;
use crate::domain::registry::Player;
use crate::domain::tuning::{ScoringMode, WorldTuning};

pub fn bird_rect(player: &Player, tuning: &WorldTuning) -> Rect {
    Rect::new(player.x, player.y, tuning.bird_size, tuning.bird_size)
}

/// Advances one alive bird by a single tick.
///
/// Gravity is a flat per-tick displacement, not an integrated velocity. Returns true when the
/// bird left the viewport on this tick and was marked dead.
pub fn tick_player(player: &mut Player, tuning: &WorldTuning, scoring: ScoringMode) -> bool {
    if !player.alive {
        return false;
    }

    player.y += tuning.gravity;
    player.distance += tuning.scroll_speed;
    if scoring == ScoringMode::Distance {
        player.score = (player.distance / tuning.distance_per_point.max(1)) as u32;
    }

    if tuning.obstacles.out_of_bounds(&bird_rect(player, tuning)) {
        player.alive = false;
        return true;
    }
    false
}
