//! Triangular rack layout.

use glam::Vec2;

/// Balls in a full rack.
pub const RACK_SIZE: usize = 15;

/// Rows in the triangle; row `r` holds `r + 1` balls.
pub const RACK_ROWS: usize = 5;

/// Center-to-center spacing, a hair over one diameter so racked balls do not start overlapping.
pub fn rack_gap(ball_radius: f32) -> f32 {
    ball_radius * 2.02
}

/// Rack slots in row-major order from the apex at `origin`.
/// Rows spread toward +x, balls within a row are centered on `origin.y`.
///
/// ```text
///  0
///  1  2
///  3  4  5
///  6  7  8  9
/// 10 11 12 13 14
/// ```
pub fn rack_slots(origin: Vec2, ball_radius: f32) -> [Vec2; RACK_SIZE] {
    let gap = rack_gap(ball_radius);
    let row_offset = gap * 0.87; // ~sqrt(3)/2

    let mut slots = [Vec2::ZERO; RACK_SIZE];
    let mut i = 0;
    for row in 0..RACK_ROWS {
        let x = origin.x + row as f32 * row_offset;
        for k in 0..=row {
            let y = origin.y + (k as f32 - row as f32 * 0.5) * gap;
            slots[i] = Vec2::new(x, y);
            i += 1;
        }
    }
    slots
}
