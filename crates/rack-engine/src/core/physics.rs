use glam::Vec2;
use rapier2d::parry::shape::Shape;
use rapier2d::prelude::*;

use crate::api::types::FixtureTag;

// ---------------------------------------------------------------------------
// glam <-> nalgebra conversions, private to this module
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn vec2_to_point(v: Vec2) -> nalgebra::Point2<f32> {
    nalgebra::Point2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn na_iso_to_pos_rot(iso: &nalgebra::Isometry2<f32>) -> (Vec2, f32) {
    let pos = Vec2::new(iso.translation.x, iso.translation.y);
    let rot = iso.rotation.angle();
    (pos, rot)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The kind of rigid body. Table furniture is fixed, balls are dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Dynamic,
    Fixed,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Fixed => RigidBodyType::Fixed,
        }
    }
}

/// Collider shapes the table uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
    /// Closed boundary through the given vertices (body-local).
    /// The last vertex is joined back to the first.
    Loop { vertices: Vec<Vec2> },
}

impl ColliderDesc {
    fn build_collider(&self) -> ColliderBuilder {
        match self {
            ColliderDesc::Ball { radius } => ColliderBuilder::ball(*radius),
            ColliderDesc::Cuboid { half_width, half_height } => {
                ColliderBuilder::cuboid(*half_width, *half_height)
            }
            ColliderDesc::Loop { vertices } => {
                let mut points: Vec<nalgebra::Point2<f32>> =
                    vertices.iter().map(|v| vec2_to_point(*v)).collect();
                if let Some(&first) = points.first() {
                    points.push(first);
                }
                ColliderBuilder::polyline(points, None)
            }
        }
    }
}

/// Surface response of a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            friction: 0.5,
            density: 1.0,
        }
    }
}

/// Category/mask pair deciding which fixtures may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: Group,
    pub mask: Group,
}

impl CollisionFilter {
    const BALL: Group = Group::GROUP_1;
    const RAIL: Group = Group::GROUP_2;
    const POCKET: Group = Group::GROUP_3;

    /// Balls touch other balls, the rails and the pocket sensors.
    pub fn ball() -> Self {
        Self {
            category: Self::BALL,
            mask: Self::BALL | Self::RAIL | Self::POCKET,
        }
    }

    pub fn rail() -> Self {
        Self {
            category: Self::RAIL,
            mask: Self::BALL,
        }
    }

    pub fn pocket() -> Self {
        Self {
            category: Self::POCKET,
            mask: Self::BALL,
        }
    }

    fn to_rapier(self) -> InteractionGroups {
        InteractionGroups::new(self.category, self.mask)
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: Group::ALL,
            mask: Group::ALL,
        }
    }
}

/// Everything needed to create one body with a single collider.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub ccd: bool,
    pub collider: ColliderDesc,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Sensors report overlaps but never push back.
    pub sensor: bool,
    pub filter: CollisionFilter,
    /// Emit begin/end contact callbacks for this collider.
    pub report_contacts: bool,
}

impl BodyDesc {
    /// Moving body; balls.
    pub fn dynamic(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            ccd: false,
            collider,
            linear_damping: 0.0,
            angular_damping: 0.0,
            sensor: false,
            filter: CollisionFilter::default(),
            report_contacts: false,
        }
    }

    /// Static geometry: rails and pocket sensors.
    pub fn fixed(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Fixed,
            ..Self::dynamic(collider)
        }
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.velocity = vel;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    /// This is what stands in for rolling resistance on the felt.
    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    /// Spin decay. Higher values kill spin faster.
    pub fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_contact_reports(mut self, enabled: bool) -> Self {
        self.report_contacts = enabled;
        self
    }
}

/// Handle pair referencing Rapier internals. Cheap to copy; does not own the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// One side of a contact, resolved from the collider at callback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixture {
    pub body: PhysicsBody,
    pub tag: FixtureTag,
    pub sensor: bool,
}

/// A begin/end contact between two fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: Fixture,
    pub b: Fixture,
}

impl Contact {
    /// If exactly one side matches `pred`, return `(matching, other)`.
    pub fn split<F>(&self, pred: F) -> Option<(Fixture, Fixture)>
    where
        F: Fn(&Fixture) -> bool,
    {
        match (pred(&self.a), pred(&self.b)) {
            (true, false) => Some((self.a, self.b)),
            (false, true) => Some((self.b, self.a)),
            _ => None,
        }
    }
}

/// Receives contact callbacks from *inside* a simulation step.
///
/// The world is locked while these run: implementations may only record what
/// happened. Structural changes (removing bodies) belong after `step()` returns.
pub trait ContactListener: Send + Sync {
    fn begin_contact(&self, contact: &Contact);

    fn end_contact(&self, _contact: &Contact) {}
}

/// Result of a ray cast against the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub tag: FixtureTag,
    /// Distance along the (normalized) ray direction.
    pub toi: f32,
    pub point: Vec2,
}

// ---------------------------------------------------------------------------
// Rapier event bridge
// ---------------------------------------------------------------------------

fn resolve_fixture(colliders: &ColliderSet, handle: ColliderHandle) -> Option<Fixture> {
    let collider = colliders.get(handle)?;
    let body_handle = collider.parent()?;
    Some(Fixture {
        body: PhysicsBody {
            body_handle,
            collider_handle: handle,
        },
        tag: FixtureTag::from_user_data(collider.user_data),
        sensor: collider.is_sensor(),
    })
}

struct ListenerBridge<'a> {
    listener: Option<&'a dyn ContactListener>,
}

impl EventHandler for ListenerBridge<'_> {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let listener = match self.listener {
            Some(l) => l,
            None => return,
        };
        let (h1, h2, started) = match event {
            CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
            CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
        };
        // Colliders removed this step no longer resolve; their events are dropped.
        if let (Some(a), Some(b)) = (resolve_fixture(colliders, h1), resolve_fixture(colliders, h2)) {
            let contact = Contact { a, b };
            if started {
                listener.begin_contact(&contact);
            } else {
                listener.end_contact(&contact);
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
        // Contact forces are never requested, but the trait requires this.
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Wraps all Rapier2D boilerplate into a single struct.
///
/// Exclusively owned by the session; every other subsystem borrows it per call.
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    listener: Option<Box<dyn ContactListener>>,
    locked: bool,
}

impl PhysicsWorld {
    /// Empty world with the given gravity.
    /// A top-down table uses `Vec2::ZERO`.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            listener: None,
            locked: false,
        }
    }

    /// Set the fixed step length in seconds.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// True while a step is executing. Bodies must not be destroyed in that window.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    #[cfg(test)]
    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Install the contact listener, replacing any previous one.
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        if self.listener.is_some() {
            log::warn!("Replacing an installed contact listener");
        }
        self.listener = Some(listener);
    }

    pub fn has_contact_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Raw Rapier body set, for queries the wrapper does not cover.
    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    /// Raw Rapier collider set.
    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    /// Insert a body and its collider, tagging the collider with `tag`.
    /// The tag is stored in both `user_data` slots for contact lookups.
    pub fn create_body(
        &mut self,
        tag: FixtureTag,
        desc: &BodyDesc,
        material: ColliderMaterial,
    ) -> PhysicsBody {
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(vec2_to_na(desc.position))
            .linvel(vec2_to_na(desc.velocity))
            .ccd_enabled(desc.ccd)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .user_data(tag.to_user_data())
            .build();

        let body_handle = self.bodies.insert(rb);

        let events = if desc.report_contacts {
            ActiveEvents::COLLISION_EVENTS
        } else {
            ActiveEvents::empty()
        };
        let collider = desc
            .collider
            .build_collider()
            .restitution(material.restitution)
            .friction(material.friction)
            .density(material.density)
            .sensor(desc.sensor)
            .collision_groups(desc.filter.to_rapier())
            .active_events(events)
            .user_data(tag.to_user_data())
            .build();

        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        self.sync_queries();

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Remove a body and its collider. Refused (returns `false`) while the world is locked.
    pub fn remove_body(&mut self, body: &PhysicsBody) -> bool {
        if self.locked {
            log::warn!("Refusing to remove {:?} while the world is stepping", body.body_handle);
            return false;
        }
        let removed = self
            .bodies
            .remove(
                body.body_handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();
        if removed {
            self.sync_queries();
        }
        removed
    }

    /// Queries only see collider moves made by `step()` unless this runs.
    fn sync_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Whether the body still exists in the simulation.
    pub fn contains(&self, body: &PhysicsBody) -> bool {
        self.bodies.contains(body.body_handle)
    }

    /// Advance the simulation by one `dt`. The contact listener runs inside this call.
    pub fn step(&mut self) {
        let bridge = ListenerBridge {
            listener: self.listener.as_deref(),
        };
        self.locked = true;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &bridge,
        );
        self.locked = false;
    }

    pub fn set_velocity(&mut self, body: &PhysicsBody, vel: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(vec2_to_na(vel), true);
        }
    }

    /// Linear velocity. Zero for a removed body.
    pub fn velocity(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn angular_velocity(&self, body: &PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.angvel())
            .unwrap_or(0.0)
    }

    /// Teleport a body and bring it to a dead stop.
    pub fn place_at_rest(&mut self, body: &PhysicsBody, pos: Vec2) {
        let iso = match self.bodies.get_mut(body.body_handle) {
            Some(rb) => {
                rb.set_translation(vec2_to_na(pos), true);
                rb.set_linvel(nalgebra::Vector2::zeros(), true);
                rb.set_angvel(0.0, true);
                rb.reset_forces(true);
                *rb.position()
            }
            None => return,
        };
        // The collider follows its body only at the next step; move it now for queries.
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.set_position(iso);
        }
        self.sync_queries();
    }

    /// Position and rotation (radians). Zero for a removed body.
    pub fn body_position(&self, body: &PhysicsBody) -> (Vec2, f32) {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_iso_to_pos_rot(rb.position()))
            .unwrap_or((Vec2::ZERO, 0.0))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Tag stored on a body's collider, if it still exists.
    pub fn fixture_tag(&self, body: &PhysicsBody) -> Option<FixtureTag> {
        self.colliders
            .get(body.collider_handle)
            .map(|c| FixtureTag::from_user_data(c.user_data))
    }

    /// Shape of the body's collider, as it was created.
    /// `None` once the collider is gone.
    pub fn collider_shape(&self, body: &PhysicsBody) -> Option<ColliderDesc> {
        let collider = self.colliders.get(body.collider_handle)?;
        shape_desc(collider.shape())
    }

    /// Cast a ray from `origin` along `dir` (normalized internally) up to `max_len`.
    /// Sensors count as obstructions. `exclude` skips one collider, e.g. the caster's own.
    pub fn cast_ray(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_len: f32,
        exclude: Option<ColliderHandle>,
    ) -> Option<RayHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec2::ZERO || max_len <= 0.0 {
            return None;
        }
        let ray = Ray::new(vec2_to_point(origin), vec2_to_na(dir));
        let mut filter = QueryFilter::default();
        if let Some(handle) = exclude {
            filter = filter.exclude_collider(handle);
        }
        let (collider, toi) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            max_len,
            true,
            filter,
        )?;
        let tag = self
            .colliders
            .get(collider)
            .map(|c| FixtureTag::from_user_data(c.user_data))
            .unwrap_or(FixtureTag::Untagged);
        Some(RayHit {
            collider,
            tag,
            toi,
            point: origin + dir * toi,
        })
    }
}

pub(crate) fn shape_desc(shape: &dyn Shape) -> Option<ColliderDesc> {
    if let Some(ball) = shape.as_ball() {
        Some(ColliderDesc::Ball { radius: ball.radius })
    } else if let Some(cuboid) = shape.as_cuboid() {
        Some(ColliderDesc::Cuboid {
            half_width: cuboid.half_extents.x,
            half_height: cuboid.half_extents.y,
        })
    } else if let Some(polyline) = shape.as_polyline() {
        let mut vertices: Vec<Vec2> = polyline
            .vertices()
            .iter()
            .map(|p| Vec2::new(p.x, p.y))
            .collect();
        // Loops are stored closed; report them open like `ColliderDesc::Loop` expects.
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Some(ColliderDesc::Loop { vertices })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
