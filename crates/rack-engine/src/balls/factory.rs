use glam::Vec2;

use crate::api::types::{BallId, FixtureTag};
use crate::core::physics::{BodyDesc, ColliderDesc, ColliderMaterial, CollisionFilter, PhysicsBody, PhysicsWorld};
use crate::core::rng::JitterRng;
use crate::table::config::TableConfig;

use super::layout::{rack_slots, RACK_SIZE};

// Felt-table tuning. Damping stands in for rolling resistance and spin loss.
const BALL_MATERIAL: ColliderMaterial = ColliderMaterial {
    restitution: 0.95,
    friction: 0.2,
    density: 0.8,
};
const LINEAR_DAMPING: f32 = 0.90;
const ANGULAR_DAMPING: f32 = 0.40;

/// Spawn positions are nudged by up to this much so racked balls never start perfectly stacked.
const SPAWN_JITTER: f32 = 0.001;

/// Cue plus a full rack.
const ARENA_SIZE: usize = RACK_SIZE + 1;

/// Spawns and repositions the cue ball and the rack, and owns the id↔body bookkeeping.
///
/// Bodies are indexed by [`BallId`] in a fixed arena. The ordered object list
/// tracks live object balls in spawn order; it shrinks when a ball is potted.
pub struct BallFactory {
    config: TableConfig,
    arena: [Option<PhysicsBody>; ARENA_SIZE],
    objects: Vec<PhysicsBody>,
    rng: JitterRng,
    rack_spawned: bool,
}

impl BallFactory {
    pub fn new(config: TableConfig, seed: u64) -> Self {
        Self {
            config,
            arena: [None; ARENA_SIZE],
            objects: Vec::with_capacity(RACK_SIZE),
            rng: JitterRng::new(seed),
            rack_spawned: false,
        }
    }

    fn ball_desc(&self, pos: Vec2) -> BodyDesc {
        BodyDesc::dynamic(ColliderDesc::Ball {
            radius: self.config.ball_radius(),
        })
        .with_position(pos)
        .with_linear_damping(LINEAR_DAMPING)
        .with_angular_damping(ANGULAR_DAMPING)
        .with_ccd(true)
        .with_filter(CollisionFilter::ball())
    }

    fn jitter(&mut self) -> Vec2 {
        self.rng.offset(SPAWN_JITTER)
    }

    fn spawn(&mut self, world: &mut PhysicsWorld, id: BallId, pos: Vec2) -> PhysicsBody {
        let pos = pos + self.jitter();
        let body = world.create_body(FixtureTag::Ball(id), &self.ball_desc(pos), BALL_MATERIAL);
        self.arena[id.index()] = Some(body);
        body
    }

    /// Spawn the cue ball at `pos`. Returns the existing cue if there already is one.
    pub fn spawn_cue(&mut self, world: &mut PhysicsWorld, pos: Vec2) -> PhysicsBody {
        if let Some(cue) = self.cue() {
            return cue;
        }
        let body = self.spawn(world, BallId::CUE, pos);
        log::info!("Cue ball spawned at ({:.3}, {:.3})", pos.x, pos.y);
        body
    }

    /// Lay out a full rack with its apex at `origin`, ids 1..=15 in slot order.
    /// Does nothing while any object ball is still on the table.
    pub fn spawn_rack_triangle(&mut self, world: &mut PhysicsWorld, origin: Vec2) {
        if !self.objects.is_empty() {
            return;
        }
        for (i, slot) in rack_slots(origin, self.config.ball_radius()).into_iter().enumerate() {
            let id = BallId(i as u8 + 1);
            let body = self.spawn(world, id, slot);
            self.objects.push(body);
        }
        self.rack_spawned = true;
        log::info!("Rack of {} spawned at ({:.3}, {:.3})", self.objects.len(), origin.x, origin.y);
    }

    /// Move the cue back to `pos` and stop it. No-op without a cue.
    pub fn reset_cue(&mut self, world: &mut PhysicsWorld, pos: Vec2) {
        if let Some(cue) = self.cue() {
            world.place_at_rest(&cue, pos);
        }
    }

    /// Move every surviving object ball into the rack slots (in list order) and stop it.
    /// Same slot math as [`spawn_rack_triangle`](Self::spawn_rack_triangle), without jitter.
    pub fn reset_rack(&mut self, world: &mut PhysicsWorld, origin: Vec2) {
        let slots = rack_slots(origin, self.config.ball_radius());
        for (body, slot) in self.objects.iter().zip(slots) {
            world.place_at_rest(body, slot);
        }
    }

    pub fn cue(&self) -> Option<PhysicsBody> {
        self.arena[BallId::CUE.index()]
    }

    pub fn cue_position(&self, world: &PhysicsWorld) -> Option<Vec2> {
        self.cue().map(|cue| world.body_position(&cue).0)
    }

    /// Body registered under `id`, if it is still on the table.
    pub fn body(&self, id: BallId) -> Option<PhysicsBody> {
        self.arena.get(id.index()).copied().flatten()
    }

    /// Resolve a body back to its id.
    pub fn id_of(&self, body: &PhysicsBody) -> Option<BallId> {
        self.arena
            .iter()
            .position(|slot| slot.as_ref() == Some(body))
            .map(|i| BallId(i as u8))
    }

    /// Live object-ball bodies in spawn order.
    pub fn object_bodies(&self) -> &[PhysicsBody] {
        &self.objects
    }

    /// Object-ball positions in list order. Indices shift after a pot;
    /// use [`object_balls`](Self::object_balls) to key by id.
    pub fn object_ball_positions(&self, world: &PhysicsWorld) -> Vec<Vec2> {
        self.objects
            .iter()
            .map(|body| world.body_position(body).0)
            .collect()
    }

    /// Object-ball positions keyed by id, in spawn order.
    pub fn object_balls(&self, world: &PhysicsWorld) -> Vec<(BallId, Vec2)> {
        self.arena
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, slot)| slot.map(|body| (BallId(i as u8), world.body_position(&body).0)))
            .collect()
    }

    /// Take an object ball off the table and destroy its body.
    /// Refused while the world is locked; the cue is never removed.
    pub fn remove(&mut self, world: &mut PhysicsWorld, id: BallId) -> bool {
        if id.is_cue() || world.is_locked() {
            return false;
        }
        let body = match self.arena.get_mut(id.index()).and_then(Option::take) {
            Some(body) => body,
            None => return false,
        };
        self.objects.retain(|b| *b != body);
        world.remove_body(&body)
    }

    /// Bodies in the id arena: object list plus the cue, if present.
    pub fn registered_count(&self) -> usize {
        self.arena.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// True once a rack has been laid out, even if every ball has since been potted.
    pub fn is_spawned(&self) -> bool {
        self.rack_spawned
    }
}
