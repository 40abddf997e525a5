pub mod api;
pub mod core;
pub mod table;
pub mod balls;
pub mod pockets;
pub mod game;
pub mod bridge;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::collab::{Rules, RulesEvent, TablePresenter};
pub use api::types::{BallId, FixtureTag, PocketIndex, POCKET_COUNT};
pub use balls::factory::BallFactory;
pub use balls::layout::{rack_slots, RACK_SIZE};
pub use bridge::protocol::{BallSlot, FrameBuffer, FrameEvent};
pub use core::physics::{
    BodyDesc, BodyType, ColliderDesc, ColliderMaterial, CollisionFilter, Contact,
    ContactListener, Fixture, PhysicsBody, PhysicsWorld, RayHit,
};
pub use core::time::SessionClock;
pub use game::pool::{PoolGame, TICK_DT};
pub use pockets::contact::{ContactPhase, PocketContactSystem, PocketOutcome};
pub use systems::debug::{collider_outlines, DebugOutline};
pub use table::builder::TableBuilder;
pub use table::config::{ConfigError, TableConfig, TableConfigBuilder};
pub use table::coords::{from_norm, to_norm};
