// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f};

/// A single ray as handed to traversal.
///
/// `dir` is used as given; it is not normalized. `inv_dir`, `swap_xz` and
/// `swap_yz` are derived by `prepare` and are stale until it runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3f,
    pub dir: Vector3f,
    pub inv_dir: Vector3f,
    pub max_t: Float,
    pub swap_xz: bool,
    pub swap_yz: bool,
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vector3f::zeros(),
            dir: Vector3f::new(0.0, 0.0, 1.0),
            inv_dir: Vector3f::new(Float::INFINITY, Float::INFINITY, 1.0),
            max_t: Float::MAX,
            swap_xz: false,
            swap_yz: false,
        }
    }
}

impl Ray {
    pub fn new(o: Vector3f, d: Vector3f, max_t: Option<Float>) -> Self {
        let mut ray = Self {
            origin: o,
            dir: d,
            max_t: max_t.unwrap_or(Float::MAX),
            ..Self::default()
        };
        ray.prepare();
        ray
    }

    pub fn at(&self, t: Float) -> Vector3f {
        self.origin + self.dir * t
    }

    /// Computes the inverse direction and picks the axis swap that makes the
    /// largest-magnitude component play the role of Z during triangle tests.
    pub fn prepare(&mut self) {
        // Zero components become signed infinities for the slab tests.
        self.inv_dir = self.dir.map(|c| 1.0 / c);

        let axis = self.dominant_axis();
        self.swap_xz = axis == 0;
        self.swap_yz = axis == 1;
    }

    /// Index of the largest-magnitude component, preferring X then Y on ties.
    pub fn dominant_axis(&self) -> usize {
        let a = self.dir.abs();
        if a.x >= a.y && a.x >= a.z {
            0
        } else if a.y >= a.z {
            1
        } else {
            2
        }
    }
}

/* Tests for Ray */
