use glam::Vec2;

use crate::api::types::{FixtureTag, PocketIndex, POCKET_COUNT};
use crate::core::physics::{BodyDesc, ColliderDesc, ColliderMaterial, CollisionFilter, PhysicsBody, PhysicsWorld};

use super::config::TableConfig;

/// Cushions are slick and lively.
const RAIL_MATERIAL: ColliderMaterial = ColliderMaterial {
    restitution: 0.98,
    friction: 0.05,
    density: 1.0,
};

/// Builds the static table furniture: one closed rail boundary and six pocket sensors.
///
/// Does not own the world. Each build step runs at most once; repeated calls are no-ops.
pub struct TableBuilder {
    config: TableConfig,
    rails: Option<PhysicsBody>,
    pockets: Vec<PhysicsBody>,
}

impl TableBuilder {
    pub fn new(config: TableConfig) -> Self {
        Self {
            config,
            rails: None,
            pockets: Vec::with_capacity(POCKET_COUNT),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Inner cushion corners, counter-clockwise from bottom-left.
    pub fn rail_vertices(&self) -> [Vec2; 4] {
        let x = self.config.half_w() - self.config.rail_x();
        let y = self.config.half_h() - self.config.rail_y();
        [
            Vec2::new(-x, -y),
            Vec2::new(x, -y),
            Vec2::new(x, y),
            Vec2::new(-x, y),
        ]
    }

    /// Pocket centers by index: four corners, then the two long-rail midpoints.
    pub fn pocket_centers(&self) -> [Vec2; POCKET_COUNT] {
        let funnel = self.config.pocket_funnel();
        let x = self.config.half_w() - self.config.pocket_inset_x() + funnel;
        let y = self.config.half_h() - self.config.pocket_inset_y() + funnel;
        [
            Vec2::new(-x, -y),
            Vec2::new(x, -y),
            Vec2::new(-x, y),
            Vec2::new(x, y),
            Vec2::new(0.0, -y),
            Vec2::new(0.0, y),
        ]
    }

    pub fn build_rails(&mut self, world: &mut PhysicsWorld) {
        if self.rails.is_some() {
            return;
        }
        let desc = BodyDesc::fixed(ColliderDesc::Loop {
            vertices: self.rail_vertices().to_vec(),
        })
        .with_filter(CollisionFilter::rail());
        self.rails = Some(world.create_body(FixtureTag::Rail, &desc, RAIL_MATERIAL));
        log::info!(
            "Rails built: {:.3} x {:.3} play area",
            self.config.table_w() - 2.0 * self.config.rail_x(),
            self.config.table_h() - 2.0 * self.config.rail_y()
        );
    }

    pub fn build_pocket_sensors(&mut self, world: &mut PhysicsWorld) {
        if !self.pockets.is_empty() {
            return;
        }
        let radius = self.config.pocket_radius();
        for (index, center) in self.pocket_centers().into_iter().enumerate() {
            let desc = BodyDesc::fixed(ColliderDesc::Ball { radius })
                .with_position(center)
                .with_sensor(true)
                .with_filter(CollisionFilter::pocket())
                .with_contact_reports(true);
            let tag = FixtureTag::Pocket(index as PocketIndex);
            self.pockets.push(world.create_body(tag, &desc, ColliderMaterial::default()));
        }
        log::info!("{} pocket sensors built (radius {:.4})", self.pockets.len(), radius);
    }

    /// True once the rails exist.
    pub fn is_built(&self) -> bool {
        self.rails.is_some()
    }

    pub fn pockets_built(&self) -> bool {
        !self.pockets.is_empty()
    }

    pub fn rails(&self) -> Option<PhysicsBody> {
        self.rails
    }

    pub fn pocket_bodies(&self) -> &[PhysicsBody] {
        &self.pockets
    }
}
