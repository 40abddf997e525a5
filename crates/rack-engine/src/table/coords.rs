//! Transforms between simulation-world units (origin at the table center)
//! and normalized `[0, 1]²` table space used by the presentation layer.

use glam::Vec2;

use super::config::TableConfig;

fn dimensions(cfg: &TableConfig) -> Vec2 {
    Vec2::new(cfg.table_w(), cfg.table_h())
}

/// World position to normalized table space, clamped per axis.
pub fn to_norm(world: Vec2, cfg: &TableConfig) -> Vec2 {
    let dim = dimensions(cfg);
    ((world + dim * 0.5) / dim).clamp(Vec2::ZERO, Vec2::ONE)
}

/// Normalized table position back to world units.
/// Inputs are clamped first, so the result always lies on the table.
pub fn from_norm(nx: f32, ny: f32, cfg: &TableConfig) -> Vec2 {
    let n = Vec2::new(nx, ny).clamp(Vec2::ZERO, Vec2::ONE);
    let dim = dimensions(cfg);
    n * dim - dim * 0.5
}
