use glam::Vec2;
use rack_engine::bridge::protocol::{EVENT_FOUL, EVENT_SCORE_UPDATED, EVENT_TURN_CHANGED};
use rack_engine::game::pool::cue_spot;
use rack_engine::{
    BallFactory, BallId, FrameBuffer, FrameEvent, PhysicsBody, PhysicsWorld, PocketIndex, PoolGame,
    Rules, RulesEvent, TableConfig, TablePresenter,
};

/// Cue speed ceiling in m/s; a hard break is around 8-9 m/s, this keeps shots on the table.
const MAX_SHOT_SPEED: f32 = 6.0;

/// Below this every ball counts as stopped.
const REST_SPEED: f32 = 0.01;

/// Two players, alternating after any shot that pots nothing. A scratch during a
/// shot is a foul and the cue returns to its spot once the table comes to rest.
/// A scratch with no shot in progress is only respotted.
pub struct FreePlayRules {
    cue_spot: Vec2,
    current: u8,
    scores: [u32; 2],
    shot_in_progress: bool,
    potted_this_shot: bool,
    scratched: bool,
    events: Vec<RulesEvent>,
}

impl FreePlayRules {
    pub fn new(cue_spot: Vec2) -> Self {
        Self {
            cue_spot,
            current: 1,
            scores: [0; 2],
            shot_in_progress: false,
            potted_this_shot: false,
            scratched: false,
            events: Vec::new(),
        }
    }

    pub fn current_player(&self) -> u8 {
        self.current
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    fn score_event(&self) -> RulesEvent {
        RulesEvent::ScoreUpdated {
            current: self.current,
            p1: self.scores[0],
            p2: self.scores[1],
        }
    }

    fn table_at_rest(world: &PhysicsWorld, balls: &BallFactory) -> bool {
        balls
            .cue()
            .into_iter()
            .chain(balls.object_bodies().iter().copied())
            .all(|b| world.velocity(&b).length() < REST_SPEED)
    }
}

impl Rules for FreePlayRules {
    fn on_shoot(&mut self, world: &mut PhysicsWorld, cue: PhysicsBody, dx: f32, dy: f32, power: f32) {
        if self.shot_in_progress {
            log::debug!("Shot ignored: balls still moving");
            return;
        }
        let dir = Vec2::new(dx, dy).normalize_or_zero();
        if dir == Vec2::ZERO || power <= 0.0 {
            return;
        }
        world.set_velocity(&cue, dir * power.min(MAX_SHOT_SPEED));
        self.shot_in_progress = true;
        self.potted_this_shot = false;
    }

    fn on_scratch(&mut self, pocket: PocketIndex) {
        self.scratched = true;
        if !self.shot_in_progress {
            log::debug!("Cue dropped into pocket {} outside a shot", pocket);
            return;
        }
        self.events.push(RulesEvent::Foul {
            player: self.current,
            reason: format!("scratch in pocket {}", pocket),
        });
    }

    fn on_ball_potted(&mut self, ball: BallId, _pocket: PocketIndex) {
        let slot = (self.current - 1) as usize;
        self.scores[slot] += 1;
        self.potted_this_shot = true;
        log::debug!("Player {} potted ball {}", self.current, ball.0);
        self.events.push(self.score_event());
    }

    fn on_new_rack(&mut self, _balls: &BallFactory) {
        self.scores = [0; 2];
        self.current = 1;
        self.shot_in_progress = false;
        self.potted_this_shot = false;
        self.scratched = false;
        self.events.push(self.score_event());
    }

    fn update_turn(&mut self, world: &mut PhysicsWorld, balls: &mut BallFactory) {
        if self.shot_in_progress {
            if !Self::table_at_rest(world, balls) {
                return;
            }
            self.shot_in_progress = false;
            if !self.potted_this_shot {
                self.current = if self.current == 1 { 2 } else { 1 };
                self.events.push(RulesEvent::TurnChanged {
                    current: self.current,
                    p1: self.scores[0],
                    p2: self.scores[1],
                });
            }
        }
        if self.scratched {
            balls.reset_cue(world, self.cue_spot);
            self.scratched = false;
        }
    }

    fn drain_events(&mut self) -> Vec<RulesEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Writes each tick's state into the shared frame buffer.
#[derive(Default)]
pub struct FramePresenter {
    frame: FrameBuffer,
}

impl FramePresenter {
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn begin_frame(&mut self) {
        self.frame.begin_frame();
    }
}

impl TablePresenter for FramePresenter {
    fn set_cue_ball(&mut self, pos: Option<Vec2>) {
        self.frame.set_cue(pos);
    }

    fn set_balls(&mut self, balls: &[(BallId, Vec2)]) {
        self.frame.set_balls(balls);
    }

    fn on_rules_event(&mut self, event: &RulesEvent) {
        let record = match event {
            RulesEvent::TurnChanged { current, p1, p2 } => FrameEvent {
                kind: EVENT_TURN_CHANGED,
                a: *current as f32,
                b: *p1 as f32,
                c: *p2 as f32,
            },
            RulesEvent::ScoreUpdated { current, p1, p2 } => FrameEvent {
                kind: EVENT_SCORE_UPDATED,
                a: *current as f32,
                b: *p1 as f32,
                c: *p2 as f32,
            },
            RulesEvent::Foul { player, reason } => {
                log::info!("Foul by player {}: {}", player, reason);
                FrameEvent {
                    kind: EVENT_FOUL,
                    a: *player as f32,
                    ..FrameEvent::default()
                }
            }
        };
        self.frame.push_event(record);
    }
}

/// One pool session plus its frame buffer, driven by the browser.
///
/// wasm-bindgen cannot export generic structs, so `lib.rs` keeps this in a
/// `thread_local!` and exposes free functions.
pub struct SessionRunner {
    game: PoolGame<FreePlayRules, FramePresenter>,
}

impl Default for SessionRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRunner {
    pub fn new() -> Self {
        let config = TableConfig::standard();
        let rules = FreePlayRules::new(cue_spot(&config));
        let mut game = PoolGame::with_config(config, rules, FramePresenter::default());
        game.ensure_built();
        Self { game }
    }

    pub fn start(&mut self) {
        self.game.start();
    }

    pub fn stop(&mut self) {
        self.game.stop();
    }

    /// Run one browser frame. Returns the number of simulation ticks it covered.
    pub fn tick(&mut self, dt: f32) -> u32 {
        self.game.presenter_mut().begin_frame();
        self.game.advance(dt)
    }

    pub fn shoot(&mut self, dx: f32, dy: f32, power: f32) {
        self.game.shoot(dx, dy, power);
    }

    pub fn new_rack(&mut self) {
        self.game.new_rack();
    }

    pub fn place_cue(&mut self, nx: f32, ny: f32) {
        self.game.place_cue(nx, ny);
    }

    pub fn guide_len(&self, dx: f32, dy: f32, len_px: f32, px_per_meter: f32) -> f32 {
        self.game.cap_guide_len_px(dx, dy, len_px, px_per_meter)
    }

    pub fn game(&self) -> &PoolGame<FreePlayRules, FramePresenter> {
        &self.game
    }

    // ---- Pointer accessors for shared-memory reads ----

    pub fn frame_ptr(&self) -> *const f32 {
        self.game.presenter().frame().as_ptr()
    }

    pub fn frame_len(&self) -> u32 {
        self.game.presenter().frame().as_slice().len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rack_engine::bridge::protocol::{FRAME_FLOATS, HEADER_BALL_COUNT, HEADER_CUE_LIVE};

    #[test]
    fn runner_publishes_a_full_table() {
        let mut runner = SessionRunner::new();
        runner.start();
        assert_eq!(runner.tick(0.04), 1);
        let frame = runner.game().presenter().frame();
        assert_eq!(frame.frame_counter(), 1);
        assert_eq!(frame.as_slice()[HEADER_CUE_LIVE], 1.0);
        assert_eq!(frame.as_slice()[HEADER_BALL_COUNT], 15.0);
        assert_eq!(runner.frame_len() as usize, FRAME_FLOATS);
    }

    #[test]
    fn turn_passes_after_an_empty_shot() {
        let mut runner = SessionRunner::new();
        runner.start();
        // Straight up into the cushion, away from the rack.
        runner.shoot(0.0, 1.0, 1.0);
        let mut changed = false;
        for _ in 0..300 {
            runner.tick(0.033);
            if runner.game().presenter().frame().events().iter().any(|e| e.kind == EVENT_TURN_CHANGED) {
                changed = true;
                break;
            }
        }
        assert!(changed);
        assert_eq!(runner.game().rules().current_player(), 2);
    }

    #[test]
    fn second_shot_ignored_while_moving() {
        let mut runner = SessionRunner::new();
        runner.shoot(0.0, 1.0, 1.0);
        let cue = runner.game().balls().cue().unwrap();
        let v = runner.game().world().velocity(&cue);
        runner.shoot(1.0, 0.0, 5.0);
        assert_eq!(runner.game().world().velocity(&cue), v);
    }

    #[test]
    fn scratch_is_a_foul_and_respots_the_cue() {
        let mut rules = FreePlayRules::new(Vec2::new(-0.6, 0.0));
        rules.shot_in_progress = true;
        rules.on_scratch(3);
        assert!(matches!(rules.drain_events().as_slice(), [RulesEvent::Foul { player: 1, .. }]));

        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let mut balls = BallFactory::new(TableConfig::standard(), 1);
        balls.spawn_cue(&mut world, Vec2::new(1.0, 0.5));
        rules.update_turn(&mut world, &mut balls);
        let pos = balls.cue_position(&world).unwrap();
        assert!((pos - Vec2::new(-0.6, 0.0)).length() < 1e-6);
        assert_eq!(rules.current_player(), 2);
    }

    #[test]
    fn scratch_between_shots_is_respotted_without_a_foul() {
        let mut rules = FreePlayRules::new(Vec2::new(-0.6, 0.0));
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let mut balls = BallFactory::new(TableConfig::standard(), 1);
        balls.spawn_cue(&mut world, Vec2::new(1.0, 0.5));

        rules.on_scratch(1);
        assert!(rules.drain_events().is_empty());
        rules.update_turn(&mut world, &mut balls);
        let pos = balls.cue_position(&world).unwrap();
        assert!((pos - Vec2::new(-0.6, 0.0)).length() < 1e-6);
        assert_eq!(rules.current_player(), 1);
        assert!(rules.drain_events().is_empty());

        // The next clean shot leaves the cue where it stops.
        balls.reset_cue(&mut world, Vec2::new(0.2, 0.1));
        let cue = balls.cue().unwrap();
        rules.on_shoot(&mut world, cue, 0.0, 1.0, 1.0);
        world.set_velocity(&cue, Vec2::ZERO);
        rules.update_turn(&mut world, &mut balls);
        let pos = balls.cue_position(&world).unwrap();
        assert!((pos - Vec2::new(0.2, 0.1)).length() < 1e-6);
        assert!(matches!(rules.drain_events().as_slice(), [RulesEvent::TurnChanged { current: 2, .. }]));
    }

    #[test]
    fn new_rack_clears_shot_state() {
        let mut rules = FreePlayRules::new(Vec2::ZERO);
        rules.shot_in_progress = true;
        rules.on_ball_potted(BallId(3), 2);
        rules.on_scratch(0);
        rules.on_new_rack(&BallFactory::new(TableConfig::standard(), 1));
        assert!(!rules.shot_in_progress);
        assert!(!rules.potted_this_shot);
        assert!(!rules.scratched);
        assert_eq!(rules.scores(), [0, 0]);
    }

    #[test]
    fn clean_shot_after_ball_in_hand_keeps_the_cue() {
        let mut runner = SessionRunner::new();
        runner.start();
        runner.place_cue(1.0, 0.0);
        runner.tick(0.033);
        runner.place_cue(0.3, 0.5);
        let placed = runner.game().balls().cue_position(runner.game().world()).unwrap();
        runner.shoot(0.0, 1.0, 1.0);
        let mut fouls = 0;
        for _ in 0..300 {
            runner.tick(0.033);
            let events = runner.game().presenter().frame().events();
            fouls += events.iter().filter(|e| e.kind == EVENT_FOUL).count();
            if events.iter().any(|e| e.kind == EVENT_TURN_CHANGED) {
                break;
            }
        }
        assert_eq!(fouls, 0);
        let cue = runner.game().balls().cue_position(runner.game().world()).unwrap();
        assert!((cue.x - placed.x).abs() < 0.05, "cue at {:?}, placed at {:?}", cue, placed);
        assert!(cue.distance(runner.game().cue_spot()) > 0.05);
    }

    #[test]
    fn pots_score_for_the_shooter() {
        let mut rules = FreePlayRules::new(Vec2::ZERO);
        rules.on_ball_potted(BallId(4), 0);
        rules.on_ball_potted(BallId(9), 5);
        assert_eq!(rules.scores(), [2, 0]);
        let events = rules.drain_events();
        assert_eq!(events.last(), Some(&RulesEvent::ScoreUpdated { current: 1, p1: 2, p2: 0 }));
    }

    #[test]
    fn presenter_encodes_rules_events() {
        let mut presenter = FramePresenter::default();
        presenter.begin_frame();
        presenter.on_rules_event(&RulesEvent::TurnChanged { current: 2, p1: 3, p2: 1 });
        presenter.on_rules_event(&RulesEvent::Foul { player: 2, reason: "scratch".into() });
        let events = presenter.frame().events();
        assert_eq!(events[0], FrameEvent { kind: EVENT_TURN_CHANGED, a: 2.0, b: 3.0, c: 1.0 });
        assert_eq!(events[1].kind, EVENT_FOUL);
        assert_eq!(events[1].a, 2.0);
    }
}
