/// Fixed-period session clock.
///
/// Real frame time goes in, whole simulation ticks come out. While stopped the
/// clock yields nothing; stopping discards any partial tick so a restart begins clean.
pub struct SessionClock {
    /// The fixed delta time per tick.
    dt: f32,
    /// Accumulated time from variable frame deltas.
    accumulator: f32,
    running: bool,
}

/// Cap to prevent a spiral of death after a long stall.
const MAX_TICKS_PER_ADVANCE: u32 = 10;

impl SessionClock {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Add frame time to the accumulator. Returns the number of fixed ticks to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if !self.running {
            return 0;
        }
        self.accumulator += frame_dt.max(0.0);
        let mut ticks = 0;
        while self.accumulator >= self.dt && ticks < MAX_TICKS_PER_ADVANCE {
            self.accumulator -= self.dt;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_ADVANCE {
            // Drop the backlog instead of chasing it next frame.
            self.accumulator = 0.0;
        }
        ticks
    }

    /// The fixed delta time.
    pub fn dt(&self) -> f32 {
        self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(dt: f32) -> SessionClock {
        let mut clock = SessionClock::new(dt);
        clock.start();
        clock
    }

    #[test]
    fn one_tick_exact() {
        let mut clock = running(0.033);
        assert_eq!(clock.accumulate(0.033), 1);
    }

    #[test]
    fn accumulates_partial() {
        let mut clock = running(0.033);
        assert_eq!(clock.accumulate(0.020), 0);
        assert_eq!(clock.accumulate(0.020), 1);
    }

    #[test]
    fn caps_at_ten_ticks() {
        let mut clock = running(0.033);
        assert_eq!(clock.accumulate(5.0), 10);
    }

    #[test]
    fn stopped_clock_yields_nothing() {
        let mut clock = SessionClock::new(0.033);
        assert_eq!(clock.accumulate(1.0), 0);
        clock.start();
        assert_eq!(clock.accumulate(0.020), 0);
        clock.stop();
        assert!(!clock.is_running());
        clock.start();
        // The partial tick from before the stop was discarded.
        assert_eq!(clock.accumulate(0.020), 0);
    }

    #[test]
    fn negative_frame_time_ignored() {
        let mut clock = running(0.033);
        assert_eq!(clock.accumulate(-1.0), 0);
        assert_eq!(clock.accumulate(0.033), 1);
    }
}
