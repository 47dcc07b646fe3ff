// Copyright @yucwang 2026

use crate::math::constants::{Float, Vector2f};

pub struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Uniform in `[0, 1)`, built from the top 24 bits so the result never
    /// rounds up to 1.
    pub fn next_f32(&mut self) -> Float {
        (self.next_u32() >> 8) as Float * (1.0 / (1u32 << 24) as Float)
    }

    pub fn next_2d(&mut self) -> Vector2f {
        let x = self.next_f32();
        let y = self.next_f32();
        Vector2f::new(x, y)
    }
}
