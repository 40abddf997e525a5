//! Debug rendering: collider wireframes for an optional overlay.
//!
//! Call [`collider_outlines`] after a step and hand the result to whatever draws lines.

use glam::Vec2;

use crate::api::types::FixtureTag;
use crate::core::physics::{ColliderDesc, PhysicsBody, PhysicsWorld};

const CIRCLE_SEGMENTS: usize = 24;

/// One closed wireframe in world units.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugOutline {
    pub tag: FixtureTag,
    /// Sensors (pockets) are usually drawn differently from solid colliders.
    pub sensor: bool,
    /// First point is repeated at the end.
    pub points: Vec<Vec2>,
}

/// Outlines for every collider attached to a body.
pub fn collider_outlines(world: &PhysicsWorld) -> Vec<DebugOutline> {
    let mut outlines = Vec::with_capacity(world.colliders().len());
    for (collider_handle, collider) in world.colliders().iter() {
        let body_handle = match collider.parent() {
            Some(h) => h,
            None => continue,
        };
        let body = PhysicsBody {
            body_handle,
            collider_handle,
        };
        let shape = match world.collider_shape(&body) {
            Some(s) => s,
            None => continue,
        };
        let (pos, rot) = world.body_position(&body);
        outlines.push(DebugOutline {
            tag: FixtureTag::from_user_data(collider.user_data),
            sensor: collider.is_sensor(),
            points: collider_outline(pos, rot, &shape),
        });
    }
    outlines
}

/// Outline points for a collider shape at a given position and rotation.
fn collider_outline(center: Vec2, rot: f32, shape: &ColliderDesc) -> Vec<Vec2> {
    let rotation = Vec2::from_angle(rot);
    let place = |local: Vec2| center + rotation.rotate(local);

    let mut points = match shape {
        ColliderDesc::Ball { radius } => (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let angle = (i as f32 / CIRCLE_SEGMENTS as f32) * std::f32::consts::TAU;
                place(Vec2::from_angle(angle) * *radius)
            })
            .collect::<Vec<_>>(),
        ColliderDesc::Cuboid {
            half_width,
            half_height,
        } => [
            Vec2::new(-half_width, -half_height),
            Vec2::new(*half_width, -half_height),
            Vec2::new(*half_width, *half_height),
            Vec2::new(-half_width, *half_height),
        ]
        .into_iter()
        .map(place)
        .collect(),
        ColliderDesc::Loop { vertices } => vertices.iter().copied().map(place).collect(),
    };
    // Close the loop
    if let Some(&first) = points.first() {
        points.push(first);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::builder::TableBuilder;
    use crate::table::config::TableConfig;
    use approx::assert_abs_diff_eq;

    #[test]
    fn table_outlines_cover_rails_and_pockets() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let mut table = TableBuilder::new(TableConfig::standard());
        table.build_rails(&mut world);
        table.build_pocket_sensors(&mut world);

        let outlines = collider_outlines(&world);
        assert_eq!(outlines.len(), 7);

        let rails: Vec<_> = outlines.iter().filter(|o| o.tag == FixtureTag::Rail).collect();
        assert_eq!(rails.len(), 1);
        assert!(!rails[0].sensor);
        assert_eq!(rails[0].points.len(), 5);

        let pockets: Vec<_> = outlines.iter().filter(|o| o.tag.pocket().is_some()).collect();
        assert_eq!(pockets.len(), 6);
        assert!(pockets.iter().all(|o| o.sensor && o.points.len() == CIRCLE_SEGMENTS + 1));
    }

    #[test]
    fn circle_is_centered_on_body() {
        let center = Vec2::new(0.4, -0.2);
        let points = collider_outline(center, 0.0, &ColliderDesc::Ball { radius: 0.05 });
        assert_eq!(points.first(), points.last());
        for p in &points {
            assert_abs_diff_eq!(p.distance(center), 0.05, epsilon = 1e-5);
        }
    }

    #[test]
    fn cuboid_respects_rotation() {
        let points = collider_outline(
            Vec2::ZERO,
            std::f32::consts::FRAC_PI_2,
            &ColliderDesc::Cuboid {
                half_width: 2.0,
                half_height: 1.0,
            },
        );
        // (-2, -1) rotated a quarter turn lands on (1, -2).
        assert_abs_diff_eq!(points[0].x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(points[0].y, -2.0, epsilon = 1e-5);
    }
}
