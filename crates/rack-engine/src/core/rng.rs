//! Small seeded generator for spawn jitter. Same seed, same rack.

use glam::Vec2;

/// splitmix64. Every seed, zero included, gives a full-period stream.
#[derive(Debug, Clone)]
pub struct JitterRng {
    state: u64,
}

impl JitterRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [-1, 1].
    pub fn signed_unit(&mut self) -> f32 {
        let bits = (self.next_u64() >> 40) as f32;
        bits / (1u32 << 23) as f32 - 1.0
    }

    /// Offset with each axis uniform in [-amplitude, amplitude].
    pub fn offset(&mut self, amplitude: f32) -> Vec2 {
        let x = self.signed_unit();
        let y = self.signed_unit();
        Vec2::new(x, y) * amplitude
    }
}
