use glam::Vec2;

use crate::api::collab::{Rules, TablePresenter};
use crate::api::types::BallId;
use crate::balls::factory::BallFactory;
use crate::core::physics::PhysicsWorld;
use crate::core::time::SessionClock;
use crate::pockets::contact::{PocketContactSystem, PocketOutcome};
use crate::systems::debug::collider_outlines;
use crate::table::builder::TableBuilder;
use crate::table::config::TableConfig;
use crate::table::coords::{from_norm, to_norm};

/// Fixed simulation period (~30 Hz).
pub const TICK_DT: f32 = 0.033;

/// Seed for the spawn jitter, so every session racks identically.
const SPAWN_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Where the cue ball starts: halfway into the left half of the table.
pub fn cue_spot(config: &TableConfig) -> Vec2 {
    Vec2::new(-config.table_w() * 0.25, 0.0)
}

/// Apex of the rack, mirrored from the cue spot.
pub fn rack_apex(config: &TableConfig) -> Vec2 {
    Vec2::new(config.table_w() * 0.25, 0.0)
}

/// One pool session: owns the physics world and every table subsystem,
/// and bridges them to the rules engine and the presentation layer.
pub struct PoolGame<R: Rules, P: TablePresenter> {
    config: TableConfig,
    world: PhysicsWorld,
    table: TableBuilder,
    balls: BallFactory,
    pockets: PocketContactSystem,
    clock: SessionClock,
    rules: R,
    presenter: P,
    debug_draw: bool,
}

impl<R: Rules, P: TablePresenter> PoolGame<R, P> {
    /// Session on a standard nine-foot table.
    pub fn new(rules: R, presenter: P) -> Self {
        Self::with_config(TableConfig::standard(), rules, presenter)
    }

    pub fn with_config(config: TableConfig, rules: R, presenter: P) -> Self {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        world.set_dt(TICK_DT);
        Self {
            config,
            world,
            table: TableBuilder::new(config),
            balls: BallFactory::new(config, SPAWN_SEED),
            pockets: PocketContactSystem::new(),
            clock: SessionClock::new(TICK_DT),
            rules,
            presenter,
            debug_draw: false,
        }
    }

    pub fn cue_spot(&self) -> Vec2 {
        cue_spot(&self.config)
    }

    pub fn rack_apex(&self) -> Vec2 {
        rack_apex(&self.config)
    }

    /// Build table, pockets and balls, each only if not already done.
    pub fn ensure_built(&mut self) {
        if !self.table.is_built() {
            self.table.build_rails(&mut self.world);
            self.table.build_pocket_sensors(&mut self.world);
        }
        self.pockets.install(&mut self.world);
        if !self.balls.is_spawned() {
            let cue_spot = self.cue_spot();
            let apex = self.rack_apex();
            self.balls.spawn_cue(&mut self.world, cue_spot);
            self.balls.spawn_rack_triangle(&mut self.world, apex);
        }
        if !self.pockets.is_bound() {
            self.pockets.bind(&self.balls);
        }
    }

    pub fn start(&mut self) {
        self.ensure_built();
        if !self.clock.is_running() {
            self.clock.start();
            log::info!("Pool session started ({} Hz)", (1.0 / TICK_DT).round());
        }
    }

    pub fn stop(&mut self) {
        if self.clock.is_running() {
            self.clock.stop();
            log::info!("Pool session stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Feed real frame time; runs as many whole ticks as have elapsed. Returns that count.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let ticks = self.clock.accumulate(frame_dt);
        for _ in 0..ticks {
            self.tick();
        }
        ticks
    }

    /// One simulation tick, whether or not the session is running.
    ///
    /// Step, drain pocket events, publish positions, then let the rules evaluate the turn.
    pub fn tick(&mut self) {
        self.world.step();

        for outcome in self.pockets.process_deferred(&mut self.world, &mut self.balls) {
            match outcome {
                PocketOutcome::Scratch { pocket } => self.rules.on_scratch(pocket),
                PocketOutcome::Potted { ball, pocket } => self.rules.on_ball_potted(ball, pocket),
            }
        }

        self.publish_positions();

        self.rules.update_turn(&mut self.world, &mut self.balls);
        for event in self.rules.drain_events() {
            self.presenter.on_rules_event(&event);
        }

        if self.debug_draw {
            let outlines = collider_outlines(&self.world);
            self.presenter.debug_outlines(&outlines);
        }
    }

    fn publish_positions(&mut self) {
        let cue = self.balls.cue_position(&self.world).map(|p| to_norm(p, &self.config));
        self.presenter.set_cue_ball(cue);

        let balls: Vec<(BallId, Vec2)> = self
            .balls
            .object_balls(&self.world)
            .into_iter()
            .map(|(id, p)| (id, to_norm(p, &self.config)))
            .collect();
        self.presenter.set_balls(&balls);
    }

    /// Forward a shot to the rules engine. No-op without a cue ball.
    pub fn shoot(&mut self, dx: f32, dy: f32, power: f32) {
        if let Some(cue) = self.balls.cue() {
            self.rules.on_shoot(&mut self.world, cue, dx, dy, power);
        }
    }

    /// Put every ball back: cue on its spot, object balls in the rack.
    /// A cleared table gets a fresh rack.
    pub fn new_rack(&mut self) {
        self.ensure_built();
        let cue_spot = self.cue_spot();
        let apex = self.rack_apex();
        self.pockets.clear_pending();
        if self.balls.object_count() == 0 {
            self.balls.spawn_rack_triangle(&mut self.world, apex);
        } else {
            self.balls.reset_rack(&mut self.world, apex);
        }
        self.balls.reset_cue(&mut self.world, cue_spot);
        self.rules.on_new_rack(&self.balls);
        log::info!("New rack: {} object balls", self.balls.object_count());
    }

    /// Ball in hand: move the cue to a normalized table position, kept inside the cushions
    /// and clear of every pocket mouth. Spawns the cue if there is none.
    pub fn place_cue(&mut self, nx: f32, ny: f32) {
        let r = self.config.ball_radius();
        let limit = Vec2::new(
            self.config.half_w() - self.config.rail_x() - r,
            self.config.half_h() - self.config.rail_y() - r,
        )
        .max(Vec2::ZERO);
        let mut pos = from_norm(nx, ny, &self.config).clamp(-limit, limit);

        // Sensor overlap starts below pocket_radius + r; keep a margin above spawn jitter.
        let clearance = self.config.pocket_radius() + r * 1.25;
        for center in self.table.pocket_centers() {
            let offset = pos - center;
            if offset.length() < clearance {
                let away = offset.try_normalize().unwrap_or_else(|| (-center).normalize_or_zero());
                pos = center + away * clearance;
            }
        }
        let pos = pos.clamp(-limit, limit);

        match self.balls.cue() {
            Some(_) => self.balls.reset_cue(&mut self.world, pos),
            None => {
                self.balls.spawn_cue(&mut self.world, pos);
            }
        }
    }

    /// Shorten an aiming guide to the first obstruction along `(dx, dy)` from the cue.
    ///
    /// `len_px` is the guide's full length in pixels and `px_per_meter` the display scale.
    /// Returns `len_px` unchanged when nothing is in the way, the direction is zero, or
    /// there is no cue ball.
    pub fn cap_guide_len_px(&self, dx: f32, dy: f32, len_px: f32, px_per_meter: f32) -> f32 {
        let cue = match self.balls.cue() {
            Some(cue) => cue,
            None => return len_px,
        };
        let dir = Vec2::new(dx, dy);
        if dir == Vec2::ZERO || px_per_meter <= 0.0 || len_px <= 0.0 {
            return len_px;
        }
        let (origin, _) = self.world.body_position(&cue);
        self.world
            .cast_ray(origin, dir, len_px / px_per_meter, Some(cue.collider_handle))
            .map(|hit| hit.toi * px_per_meter)
            .unwrap_or(len_px)
    }

    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug_draw = enabled;
    }

    pub fn debug_draw(&self) -> bool {
        self.debug_draw
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn table(&self) -> &TableBuilder {
        &self.table
    }

    pub fn balls(&self) -> &BallFactory {
        &self.balls
    }

    pub fn pockets(&self) -> &PocketContactSystem {
        &self.pockets
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut R {
        &mut self.rules
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}
