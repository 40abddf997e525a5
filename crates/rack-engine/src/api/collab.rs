use glam::Vec2;

use crate::api::types::{BallId, PocketIndex};
use crate::balls::factory::BallFactory;
use crate::core::physics::{PhysicsBody, PhysicsWorld};
use crate::systems::debug::DebugOutline;

/// Notifications a rules engine raises for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RulesEvent {
    TurnChanged { current: u8, p1: u32, p2: u32 },
    ScoreUpdated { current: u8, p1: u32, p2: u32 },
    Foul { player: u8, reason: String },
}

/// Turn and scoring logic. The session feeds it shots and pocket outcomes
/// and never looks at its internal state.
pub trait Rules {
    /// Apply a shot to the cue ball. `(dx, dy)` is the aim direction, `power` its strength.
    fn on_shoot(&mut self, world: &mut PhysicsWorld, cue: PhysicsBody, dx: f32, dy: f32, power: f32);

    fn on_scratch(&mut self, pocket: PocketIndex);

    fn on_ball_potted(&mut self, ball: BallId, pocket: PocketIndex);

    fn on_new_rack(&mut self, balls: &BallFactory);

    /// Evaluate turn state once per tick, after positions have been published.
    fn update_turn(&mut self, world: &mut PhysicsWorld, balls: &mut BallFactory);

    /// Events raised since the last call.
    fn drain_events(&mut self) -> Vec<RulesEvent> {
        Vec::new()
    }
}

/// Receives normalized ball positions once per tick.
pub trait TablePresenter {
    fn set_cue_ball(&mut self, pos: Option<Vec2>);

    /// Object balls keyed by id, positions in `[0, 1]²`.
    fn set_balls(&mut self, balls: &[(BallId, Vec2)]);

    fn on_rules_event(&mut self, _event: &RulesEvent) {}

    /// Collider wireframes in world units; only sent while debug drawing is on.
    fn debug_outlines(&mut self, _outlines: &[DebugOutline]) {}
}
