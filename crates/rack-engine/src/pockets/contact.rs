//! Pocket detection in two phases.
//!
//! During a step the installed listener only records which ball touched which
//! pocket sensor. After the step returns, [`PocketContactSystem::process_deferred`]
//! drains that record in arrival order, destroying potted object balls and
//! reporting scratches. Bodies are never removed from inside the step.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use rapier2d::prelude::RigidBodyHandle;

use crate::api::types::{BallId, PocketIndex};
use crate::balls::factory::BallFactory;
use crate::core::physics::{Contact, ContactListener, PhysicsBody, PhysicsWorld};

/// What draining one pending pocket event produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocketOutcome {
    /// The cue ball entered a pocket. Its body stays on the table.
    Scratch { pocket: PocketIndex },
    /// An object ball entered a pocket and was removed.
    Potted { ball: BallId, pocket: PocketIndex },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    /// No listener yet; nothing is recorded.
    Created,
    /// Listener installed, no ball roster bound. Only scratches are reported.
    Installed,
    /// Fully operational. `roster` is the number of balls registered at bind time.
    Bound { roster: usize },
}

#[derive(Debug, Clone, Copy)]
struct PendingPot {
    body: PhysicsBody,
    pocket: PocketIndex,
    cue: bool,
}

#[derive(Default)]
struct PendingPockets {
    queue: VecDeque<PendingPot>,
    queued: HashSet<RigidBodyHandle>,
}

struct PocketListener {
    pending: Arc<Mutex<PendingPockets>>,
}

impl ContactListener for PocketListener {
    fn begin_contact(&self, contact: &Contact) {
        // Exactly one side must be a pocket sensor, the other a ball.
        let (pocket, other) = match contact.split(|f| f.sensor && f.tag.pocket().is_some()) {
            Some(pair) => pair,
            None => return,
        };
        let (index, ball) = match (pocket.tag.pocket(), other.tag.ball()) {
            (Some(index), Some(ball)) => (index, ball),
            _ => return,
        };

        let mut pending = self.pending.lock();
        let cue = ball.is_cue();
        // The cue is never removed, so every entry must be reported.
        if !cue && !pending.queued.insert(other.body.body_handle) {
            return;
        }
        pending.queue.push_back(PendingPot {
            body: other.body,
            pocket: index,
            cue,
        });
        log::debug!("Ball {} queued for pocket {}", ball.0, index);
    }
}

/// Installs the pocket listener and applies its recorded events once per tick.
pub struct PocketContactSystem {
    phase: ContactPhase,
    pending: Arc<Mutex<PendingPockets>>,
}

impl Default for PocketContactSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl PocketContactSystem {
    pub fn new() -> Self {
        Self {
            phase: ContactPhase::Created,
            pending: Arc::new(Mutex::new(PendingPockets::default())),
        }
    }

    pub fn phase(&self) -> ContactPhase {
        self.phase
    }

    pub fn is_installed(&self) -> bool {
        self.phase != ContactPhase::Created
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.phase, ContactPhase::Bound { .. })
    }

    /// Register the listener with the world. Only the first call has any effect.
    pub fn install(&mut self, world: &mut PhysicsWorld) {
        if self.phase != ContactPhase::Created {
            return;
        }
        world.set_contact_listener(Box::new(PocketListener {
            pending: Arc::clone(&self.pending),
        }));
        self.phase = ContactPhase::Installed;
        log::info!("Pocket contact listener installed");
    }

    /// Enable object-ball pot detection. Requires an installed listener and a spawned rack.
    pub fn bind(&mut self, balls: &BallFactory) -> bool {
        if self.phase != ContactPhase::Installed {
            log::warn!("Pocket bind ignored in phase {:?}", self.phase);
            return false;
        }
        if !balls.is_spawned() {
            log::warn!("Pocket bind ignored: no rack spawned yet");
            return false;
        }
        let roster = balls.registered_count();
        self.phase = ContactPhase::Bound { roster };
        log::info!("Pocket contacts bound to {} balls", roster);
        true
    }

    /// Events recorded but not yet drained.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().queue.len()
    }

    pub fn is_queued(&self, body: &PhysicsBody) -> bool {
        self.pending.lock().queue.iter().any(|p| p.body == *body)
    }

    /// Forget everything recorded so far, e.g. after the balls were re-racked.
    pub fn clear_pending(&mut self) {
        let mut pending = self.pending.lock();
        if !pending.queue.is_empty() {
            log::debug!("Discarding {} pending pocket events", pending.queue.len());
        }
        pending.queue.clear();
        pending.queued.clear();
    }

    /// Drain recorded pocket events in arrival order.
    ///
    /// Does nothing before install or while the world is mid-step. Object balls
    /// are removed from `balls` and the world; events whose ball is already gone
    /// are dropped.
    pub fn process_deferred(&mut self, world: &mut PhysicsWorld, balls: &mut BallFactory) -> Vec<PocketOutcome> {
        if self.phase == ContactPhase::Created || world.is_locked() {
            return Vec::new();
        }

        let drained: Vec<PendingPot> = {
            let mut pending = self.pending.lock();
            pending.queued.clear();
            pending.queue.drain(..).collect()
        };

        let mut outcomes = Vec::with_capacity(drained.len());
        for pot in drained {
            if pot.cue {
                log::debug!("Scratch in pocket {}", pot.pocket);
                outcomes.push(PocketOutcome::Scratch { pocket: pot.pocket });
                continue;
            }
            if !self.is_bound() {
                continue;
            }
            let id = match balls.id_of(&pot.body) {
                Some(id) => id,
                None => continue,
            };
            if balls.remove(world, id) {
                log::debug!("Ball {} potted in pocket {}", id.0, pot.pocket);
                outcomes.push(PocketOutcome::Potted {
                    ball: id,
                    pocket: pot.pocket,
                });
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::FixtureTag;
    use crate::core::physics::Fixture;
    use crate::table::builder::TableBuilder;
    use crate::table::config::TableConfig;
    use glam::Vec2;

    struct Table {
        world: PhysicsWorld,
        table: TableBuilder,
        balls: BallFactory,
        pockets: PocketContactSystem,
    }

    fn table() -> Table {
        let cfg = TableConfig::standard();
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        world.set_dt(0.033);
        let mut table = TableBuilder::new(cfg);
        table.build_rails(&mut world);
        table.build_pocket_sensors(&mut world);
        let mut balls = BallFactory::new(cfg, 1);
        let mut pockets = PocketContactSystem::new();
        pockets.install(&mut world);
        balls.spawn_cue(&mut world, Vec2::new(-0.6, 0.0));
        balls.spawn_rack_triangle(&mut world, Vec2::new(0.6, 0.0));
        Table { world, table, balls, pockets }
    }

    fn listener(pockets: &PocketContactSystem) -> PocketListener {
        PocketListener {
            pending: Arc::clone(&pockets.pending),
        }
    }

    fn pocket_contact(t: &Table, pocket: PocketIndex, ball: BallId) -> Contact {
        let sensor = t.table.pocket_bodies()[pocket as usize];
        Contact {
            a: Fixture {
                body: sensor,
                tag: FixtureTag::Pocket(pocket),
                sensor: true,
            },
            b: Fixture {
                body: t.balls.body(ball).unwrap(),
                tag: FixtureTag::Ball(ball),
                sensor: false,
            },
        }
    }

    #[test]
    fn phases_advance_in_order() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let mut balls = BallFactory::new(TableConfig::standard(), 1);
        let mut pockets = PocketContactSystem::new();
        assert_eq!(pockets.phase(), ContactPhase::Created);
        assert!(!pockets.bind(&balls));

        pockets.install(&mut world);
        pockets.install(&mut world);
        assert_eq!(pockets.phase(), ContactPhase::Installed);
        assert!(world.has_contact_listener());

        assert!(!pockets.bind(&balls), "bind before spawning must be refused");
        balls.spawn_cue(&mut world, Vec2::ZERO);
        balls.spawn_rack_triangle(&mut world, Vec2::new(0.6, 0.0));
        assert!(pockets.bind(&balls));
        assert_eq!(pockets.phase(), ContactPhase::Bound { roster: 16 });
        assert!(!pockets.bind(&balls));
    }

    #[test]
    fn duplicate_object_contacts_queue_once() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let listener = listener(&t.pockets);
        listener.begin_contact(&pocket_contact(&t, 2, BallId(7)));
        listener.begin_contact(&pocket_contact(&t, 3, BallId(7)));
        assert_eq!(t.pockets.pending_len(), 1);
        assert!(t.pockets.is_queued(&t.balls.body(BallId(7)).unwrap()));

        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(outcomes, vec![PocketOutcome::Potted { ball: BallId(7), pocket: 2 }]);
    }

    #[test]
    fn cue_contacts_are_never_deduplicated() {
        let mut t = table();
        let listener = listener(&t.pockets);
        listener.begin_contact(&pocket_contact(&t, 0, BallId::CUE));
        listener.begin_contact(&pocket_contact(&t, 4, BallId::CUE));
        assert_eq!(t.pockets.pending_len(), 2);
    }

    #[test]
    fn non_pocket_contacts_are_ignored() {
        let t = table();
        let listener = listener(&t.pockets);
        let one = t.balls.body(BallId(1)).unwrap();
        let two = t.balls.body(BallId(2)).unwrap();
        let ball = |body, id| Fixture {
            body,
            tag: FixtureTag::Ball(BallId(id)),
            sensor: false,
        };
        listener.begin_contact(&Contact { a: ball(one, 1), b: ball(two, 2) });
        let rail = Fixture {
            body: t.table.rails().unwrap(),
            tag: FixtureTag::Rail,
            sensor: false,
        };
        listener.begin_contact(&Contact { a: rail, b: ball(one, 1) });
        // Pocket against pocket has no ball side.
        let p0 = pocket_contact(&t, 0, BallId(1)).a;
        let p1 = pocket_contact(&t, 1, BallId(1)).a;
        listener.begin_contact(&Contact { a: p0, b: p1 });
        assert_eq!(t.pockets.pending_len(), 0);
    }

    #[test]
    fn pot_removes_from_list_and_map() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let body = t.balls.body(BallId(3)).unwrap();
        listener(&t.pockets).begin_contact(&pocket_contact(&t, 1, BallId(3)));

        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(outcomes, vec![PocketOutcome::Potted { ball: BallId(3), pocket: 1 }]);
        assert!(t.balls.body(BallId(3)).is_none());
        assert!(!t.balls.object_bodies().contains(&body));
        assert_eq!(t.balls.object_count(), 14);
        assert_eq!(t.balls.registered_count(), 15);
        assert!(!t.world.contains(&body));
        assert!(!t.pockets.is_queued(&body));
    }

    #[test]
    fn scratch_keeps_the_cue() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let cue = t.balls.cue().unwrap();
        listener(&t.pockets).begin_contact(&pocket_contact(&t, 5, BallId::CUE));

        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(outcomes, vec![PocketOutcome::Scratch { pocket: 5 }]);
        assert_eq!(t.balls.cue(), Some(cue));
        assert!(t.world.contains(&cue));
        assert_eq!(t.balls.registered_count(), 16);
    }

    #[test]
    fn locked_world_leaves_queue_untouched() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let listener = listener(&t.pockets);
        listener.begin_contact(&pocket_contact(&t, 0, BallId(1)));
        listener.begin_contact(&pocket_contact(&t, 0, BallId::CUE));

        t.world.set_locked(true);
        assert!(t.pockets.process_deferred(&mut t.world, &mut t.balls).is_empty());
        assert_eq!(t.pockets.pending_len(), 2);
        assert_eq!(t.balls.object_count(), 15);

        t.world.set_locked(false);
        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(
            outcomes,
            vec![
                PocketOutcome::Potted { ball: BallId(1), pocket: 0 },
                PocketOutcome::Scratch { pocket: 0 },
            ]
        );
        assert_eq!(t.pockets.pending_len(), 0);
    }

    #[test]
    fn outcomes_keep_arrival_order() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let listener = listener(&t.pockets);
        listener.begin_contact(&pocket_contact(&t, 3, BallId(9)));
        listener.begin_contact(&pocket_contact(&t, 1, BallId::CUE));
        listener.begin_contact(&pocket_contact(&t, 2, BallId(4)));
        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(
            outcomes,
            vec![
                PocketOutcome::Potted { ball: BallId(9), pocket: 3 },
                PocketOutcome::Scratch { pocket: 1 },
                PocketOutcome::Potted { ball: BallId(4), pocket: 2 },
            ]
        );
    }

    #[test]
    fn unbound_system_reports_scratches_only() {
        let mut t = table();
        assert_eq!(t.pockets.phase(), ContactPhase::Installed);
        let listener = listener(&t.pockets);
        listener.begin_contact(&pocket_contact(&t, 2, BallId(6)));
        listener.begin_contact(&pocket_contact(&t, 0, BallId::CUE));

        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(outcomes, vec![PocketOutcome::Scratch { pocket: 0 }]);
        assert_eq!(t.balls.object_count(), 15);
        // Dedup entry cleared with the dropped event.
        listener.begin_contact(&pocket_contact(&t, 2, BallId(6)));
        assert_eq!(t.pockets.pending_len(), 1);
    }

    #[test]
    fn stale_body_is_dropped() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let contact = pocket_contact(&t, 2, BallId(8));
        assert!(t.balls.remove(&mut t.world, BallId(8)));
        listener(&t.pockets).begin_contact(&contact);

        assert!(t.pockets.process_deferred(&mut t.world, &mut t.balls).is_empty());
        assert_eq!(t.pockets.pending_len(), 0);
        assert_eq!(t.balls.object_count(), 14);
    }

    #[test]
    fn clear_pending_forgets_queue_and_dedup() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let listener = listener(&t.pockets);
        listener.begin_contact(&pocket_contact(&t, 1, BallId(2)));
        t.pockets.clear_pending();
        assert_eq!(t.pockets.pending_len(), 0);
        assert!(t.pockets.process_deferred(&mut t.world, &mut t.balls).is_empty());
        listener.begin_contact(&pocket_contact(&t, 1, BallId(2)));
        assert_eq!(t.pockets.pending_len(), 1);
    }

    #[test]
    fn created_system_processes_nothing() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let mut balls = BallFactory::new(TableConfig::standard(), 1);
        let mut pockets = PocketContactSystem::new();
        assert!(pockets.process_deferred(&mut world, &mut balls).is_empty());
    }

    #[test]
    fn ball_resting_in_pocket_is_potted_by_a_step() {
        let mut t = table();
        t.pockets.bind(&t.balls);
        let target = t.table.pocket_centers()[4];
        let ball = t.balls.body(BallId(12)).unwrap();
        t.world.place_at_rest(&ball, target);

        t.world.step();
        let outcomes = t.pockets.process_deferred(&mut t.world, &mut t.balls);
        assert_eq!(outcomes, vec![PocketOutcome::Potted { ball: BallId(12), pocket: 4 }]);
        assert!(!t.world.contains(&ball));
    }
}
