// Deterministic obstacle layout derived from (round seed, world offset).
//
// Obstacle geometry is never sent over the wire: server and clients both call into this
// module with the broadcast seed and scroll offset and get identical results.

use super::rng::SlotRng;

/// Layout parameters shared by the server and every client mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleGeometry {
    pub viewport_width: i32,
    pub viewport_height: i32,
    /// Horizontal world distance between consecutive slots.
    pub spacing: u32,
    /// Obstacle column width.
    pub width: i32,
    /// Vertical opening a bird must fly through.
    pub gap_height: i32,
    /// Minimum distance between the gap and the top/bottom of the viewport.
    pub min_margin: i32,
}

impl Default for ObstacleGeometry {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 480,
            spacing: 300,
            width: 50,
            gap_height: 150,
            min_margin: 75,
        }
    }
}

/// Axis-aligned rectangle in screen space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap; touching edges do not collide.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// One obstacle column as seen on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub slot: u64,
    /// Screen-space left edge.
    pub x: i32,
    /// Top edge of the gap.
    pub gap_top: i32,
    /// True once the column is fully behind the bird.
    pub passed: bool,
}

impl Obstacle {
    pub fn top_rect(&self, geometry: &ObstacleGeometry) -> Rect {
        Rect::new(self.x, 0, geometry.width, self.gap_top)
    }

    pub fn bottom_rect(&self, geometry: &ObstacleGeometry) -> Rect {
        let bottom_y = self.gap_top + geometry.gap_height;
        Rect::new(
            self.x,
            bottom_y,
            geometry.width,
            geometry.viewport_height - bottom_y,
        )
    }

    pub fn collides(&self, bird: &Rect, geometry: &ObstacleGeometry) -> bool {
        bird.intersects(&self.top_rect(geometry)) || bird.intersects(&self.bottom_rect(geometry))
    }
}

impl ObstacleGeometry {
    /// World x of slot 0; the first column enters from the right edge of the viewport.
    pub fn lead_in(&self) -> i64 {
        i64::from(self.viewport_width)
    }

    /// World-space left edge of a slot.
    pub fn slot_world_x(&self, slot: u64) -> i64 {
        self.lead_in() + slot as i64 * i64::from(self.spacing)
    }

    fn gap_span(&self) -> u32 {
        (self.viewport_height - 2 * self.min_margin - self.gap_height).max(0) as u32
    }

    /// Gap position for one slot. Pure in (seed, slot) and the geometry.
    pub fn gap_top(&self, seed: u32, slot: u64) -> i32 {
        let mut rng = SlotRng::for_slot(seed, slot, self.spacing);
        self.min_margin + rng.next_below(self.gap_span()) as i32
    }

    /// Lowest slot whose column is still at least partly on screen.
    pub fn first_visible_slot(&self, world_offset: u64) -> u64 {
        let behind = world_offset as i64 - self.lead_in() - i64::from(self.width);
        if behind < 0 {
            0
        } else {
            (behind / i64::from(self.spacing)) as u64 + 1
        }
    }

    /// Every column with its left edge in `(-width, viewport_width]` at this scroll offset.
    pub fn window(&self, seed: u32, world_offset: u64, bird_x: i32) -> Vec<Obstacle> {
        let mut obstacles = Vec::new();
        let mut slot = self.first_visible_slot(world_offset);
        loop {
            let screen_x = self.slot_world_x(slot) - world_offset as i64;
            if screen_x > i64::from(self.viewport_width) {
                break;
            }
            let x = screen_x as i32;
            obstacles.push(Obstacle {
                slot,
                x,
                gap_top: self.gap_top(seed, slot),
                passed: x + self.width < bird_x,
            });
            slot += 1;
        }
        obstacles
    }

    /// Number of columns whose right edge has scrolled past `bird_x`.
    pub fn slots_passed(&self, world_offset: u64, bird_x: i32) -> u64 {
        let ahead = world_offset as i64 + i64::from(bird_x) - self.lead_in() - i64::from(self.width);
        if ahead <= 0 {
            0
        } else {
            let spacing = i64::from(self.spacing.max(1));
            ((ahead + spacing - 1) / spacing) as u64
        }
    }

    /// Bird touching the ceiling or the floor.
    pub fn out_of_bounds(&self, bird: &Rect) -> bool {
        bird.y < 0 || bird.y + bird.h > self.viewport_height
    }
}
