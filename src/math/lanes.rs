// Copyright @yucwang 2026

//! Structure-of-arrays lane types built on `wide` vectors.
//!
//! One lane group holds `LANE_WIDTH` independent values; every operation in
//! this module works lane-by-lane with no cross-lane traffic except the
//! horizontal reductions on `LaneMask`.

use super::constants::{Float, UInt, Vector3f};

use std::ops;
use wide::{f32x4, u32x4, CmpEq};

pub const LANE_WIDTH: usize = 4;

pub type LaneFloat = f32x4;
pub type LaneUInt = u32x4;

const LANE_BITS: u32 = (1 << LANE_WIDTH) - 1;

/// Per-lane boolean stored as an all-ones / all-zeros float bit pattern, the
/// form `wide` comparisons produce and `blend` consumes.
#[derive(Clone, Copy, Debug, Default)]
pub struct LaneMask(f32x4);

impl LaneMask {
    pub fn splat(value: bool) -> Self {
        Self(f32x4::splat(mask_lane(value)))
    }

    pub fn from_lanes(lanes: [bool; LANE_WIDTH]) -> Self {
        let mut out = [0.0; LANE_WIDTH];
        for (o, b) in out.iter_mut().zip(lanes.iter()) {
            *o = mask_lane(*b);
        }
        Self(f32x4::from(out))
    }

    /// Lane `i` is set when bit `i` of `bits` is set. Bits past the lane
    /// width are ignored.
    pub fn from_bits(bits: u32) -> Self {
        let mut lanes = [false; LANE_WIDTH];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = (bits >> i) & 1 == 1;
        }
        Self::from_lanes(lanes)
    }

    pub fn bits(self) -> u32 {
        (self.0.move_mask() as u32) & LANE_BITS
    }

    pub fn lane(self, i: usize) -> bool {
        (self.bits() >> i) & 1 == 1
    }

    pub fn any(self) -> bool {
        self.bits() != 0
    }

    pub fn all(self) -> bool {
        self.bits() == LANE_BITS
    }

    /// Per lane: `t` where set, `f` elsewhere.
    pub fn select(self, t: LaneFloat, f: LaneFloat) -> LaneFloat {
        self.0.blend(t, f)
    }

    pub fn equal(a: LaneFloat, b: LaneFloat) -> Self {
        Self(a.cmp_eq(b))
    }

    pub fn not_equal(a: LaneFloat, b: LaneFloat) -> Self {
        Self(!a.cmp_eq(b))
    }
}

fn mask_lane(value: bool) -> Float {
    if value { Float::from_bits(u32::MAX) } else { 0.0 }
}

impl ops::BitAnd for LaneMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl ops::BitOr for LaneMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::Not for LaneMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl PartialEq for LaneMask {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

pub fn lane_float(values: LaneFloat, i: usize) -> Float {
    values.to_array()[i]
}

pub fn with_lane_float(values: LaneFloat, i: usize, value: Float) -> LaneFloat {
    let mut lanes = values.to_array();
    lanes[i] = value;
    LaneFloat::from(lanes)
}

pub fn lane_uint(values: LaneUInt, i: usize) -> UInt {
    values.to_array()[i]
}

pub fn with_lane_uint(values: LaneUInt, i: usize, value: UInt) -> LaneUInt {
    let mut lanes = values.to_array();
    lanes[i] = value;
    LaneUInt::from(lanes)
}

/// `LANE_WIDTH` 3D vectors, one component per register.
#[derive(Clone, Copy, Debug, Default)]
pub struct LaneVector3f {
    pub x: LaneFloat,
    pub y: LaneFloat,
    pub z: LaneFloat,
}

impl LaneVector3f {
    /// Gathers up to `LANE_WIDTH` vectors; missing lanes are zero.
    pub fn from_slice(vectors: &[Vector3f]) -> Self {
        let mut x = [0.0; LANE_WIDTH];
        let mut y = [0.0; LANE_WIDTH];
        let mut z = [0.0; LANE_WIDTH];
        for (i, v) in vectors.iter().take(LANE_WIDTH).enumerate() {
            x[i] = v.x;
            y[i] = v.y;
            z[i] = v.z;
        }
        Self { x: LaneFloat::from(x), y: LaneFloat::from(y), z: LaneFloat::from(z) }
    }

    pub fn lane(&self, i: usize) -> Vector3f {
        Vector3f::new(lane_float(self.x, i), lane_float(self.y, i), lane_float(self.z, i))
    }

    pub fn abs(&self) -> Self {
        Self { x: self.x.abs(), y: self.y.abs(), z: self.z.abs() }
    }

    /// Component-wise `1 / v`. Zero components give signed infinities.
    pub fn recip(&self) -> Self {
        Self {
            x: LaneFloat::ONE / self.x,
            y: LaneFloat::ONE / self.y,
            z: LaneFloat::ONE / self.z,
        }
    }

    pub fn max_element(&self) -> LaneFloat {
        self.x.max(self.y).max(self.z)
    }
}
