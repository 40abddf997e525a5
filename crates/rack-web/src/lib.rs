use std::cell::RefCell;

use wasm_bindgen::prelude::*;

pub mod runner;

pub use runner::{FramePresenter, FreePlayRules, SessionRunner};

thread_local! {
    static RUNNER: RefCell<Option<SessionRunner>> = RefCell::new(None);
}

/// Run `f` against the session. Before `pool_init` every call is a logged no-op.
fn with_runner<R>(f: impl FnOnce(&mut SessionRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("Pool session not initialized. Call pool_init() first.");
                None
            }
        }
    })
}

#[wasm_bindgen]
pub fn pool_init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let runner = SessionRunner::new();
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("rack-web: initialized");
}

#[wasm_bindgen]
pub fn pool_start() {
    with_runner(|r| r.start());
}

#[wasm_bindgen]
pub fn pool_stop() {
    with_runner(|r| r.stop());
}

/// Feed one browser frame of `dt` seconds. Returns the simulation ticks it covered.
#[wasm_bindgen]
pub fn pool_tick(dt: f32) -> u32 {
    with_runner(|r| r.tick(dt)).unwrap_or(0)
}

#[wasm_bindgen]
pub fn pool_shoot(dx: f32, dy: f32, power: f32) {
    with_runner(|r| r.shoot(dx, dy, power));
}

#[wasm_bindgen]
pub fn pool_new_rack() {
    with_runner(|r| r.new_rack());
}

#[wasm_bindgen]
pub fn pool_place_cue(nx: f32, ny: f32) {
    with_runner(|r| r.place_cue(nx, ny));
}

#[wasm_bindgen]
pub fn pool_guide_len(dx: f32, dy: f32, len_px: f32, px_per_meter: f32) -> f32 {
    with_runner(|r| r.guide_len(dx, dy, len_px, px_per_meter)).unwrap_or(len_px)
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_frame_ptr() -> *const f32 {
    with_runner(|r| r.frame_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_frame_len() -> u32 {
    with_runner(|r| r.frame_len()).unwrap_or(0)
}
