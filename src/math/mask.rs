// Copyright @yucwang 2026

use super::lanes::{LaneMask, LANE_WIDTH};

use std::ops;

/// Logical mask over `LANES` boolean lanes.
///
/// `bool` is the one-lane mask used by single-ray code, `LaneMask` covers one
/// lane group and `BatchMask` a whole ray batch.
pub trait Mask:
    Copy + ops::BitAnd<Output = Self> + ops::BitOr<Output = Self> + ops::Not<Output = Self>
{
    const LANES: usize;

    fn splat(value: bool) -> Self;
    fn from_bits(bits: u32) -> Self;
    fn bits(self) -> u32;
    fn any(self) -> bool;
    fn all(self) -> bool;

    fn none(self) -> bool {
        !self.any()
    }
}

impl Mask for bool {
    const LANES: usize = 1;

    fn splat(value: bool) -> Self {
        value
    }

    fn from_bits(bits: u32) -> Self {
        bits & 1 == 1
    }

    fn bits(self) -> u32 {
        self as u32
    }

    fn any(self) -> bool {
        self
    }

    fn all(self) -> bool {
        self
    }
}

impl Mask for LaneMask {
    const LANES: usize = LANE_WIDTH;

    fn splat(value: bool) -> Self {
        LaneMask::splat(value)
    }

    fn from_bits(bits: u32) -> Self {
        LaneMask::from_bits(bits)
    }

    fn bits(self) -> u32 {
        LaneMask::bits(self)
    }

    fn any(self) -> bool {
        LaneMask::any(self)
    }

    fn all(self) -> bool {
        LaneMask::all(self)
    }
}

/// Active-lane mask for a batch of `G` lane groups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchMask<const G: usize> {
    pub masks: [LaneMask; G],
}

impl<const G: usize> Default for BatchMask<G> {
    fn default() -> Self {
        Self { masks: [LaneMask::default(); G] }
    }
}

impl<const G: usize> BatchMask<G> {
    pub fn all_true() -> Self {
        Self { masks: [LaneMask::splat(true); G] }
    }

    pub fn all_false() -> Self {
        Self::default()
    }

    pub fn set_all(&mut self, value: bool) {
        self.masks = [LaneMask::splat(value); G];
    }

    pub fn and_group(&mut self, group: usize, mask: LaneMask) {
        self.masks[group] = self.masks[group] & mask;
    }

    pub fn or_group(&mut self, group: usize, mask: LaneMask) {
        self.masks[group] = self.masks[group] | mask;
    }

    pub fn any_in(&self, group: usize) -> bool {
        self.masks[group].any()
    }

    pub fn all_in(&self, group: usize) -> bool {
        self.masks[group].all()
    }

    pub fn lane(&self, index: usize) -> bool {
        self.masks[index / LANE_WIDTH].lane(index % LANE_WIDTH)
    }
}

impl<const G: usize> Mask for BatchMask<G> {
    const LANES: usize = G * LANE_WIDTH;

    fn splat(value: bool) -> Self {
        Self { masks: [LaneMask::splat(value); G] }
    }

    /// The low `LANE_WIDTH` bits fill the first group, the next ones the
    /// second group and so on.
    fn from_bits(bits: u32) -> Self {
        let mut masks = [LaneMask::default(); G];
        let mut bits = bits;
        for m in masks.iter_mut() {
            *m = LaneMask::from_bits(bits);
            bits = bits.checked_shr(LANE_WIDTH as u32).unwrap_or(0);
        }
        Self { masks }
    }

    fn bits(self) -> u32 {
        let mut out = 0u32;
        for (i, m) in self.masks.iter().enumerate() {
            out |= m.bits().checked_shl((i * LANE_WIDTH) as u32).unwrap_or(0);
        }
        out
    }

    fn any(self) -> bool {
        self.masks.iter().any(|m| m.any())
    }

    fn all(self) -> bool {
        self.masks.iter().all(|m| m.all())
    }
}

impl<const G: usize> ops::BitAnd for BatchMask<G> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        let mut out = self;
        for (m, r) in out.masks.iter_mut().zip(rhs.masks.iter()) {
            *m = *m & *r;
        }
        out
    }
}

impl<const G: usize> ops::BitOr for BatchMask<G> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        let mut out = self;
        for (m, r) in out.masks.iter_mut().zip(rhs.masks.iter()) {
            *m = *m | *r;
        }
        out
    }
}

impl<const G: usize> ops::Not for BatchMask<G> {
    type Output = Self;

    fn not(self) -> Self {
        let mut out = self;
        for m in out.masks.iter_mut() {
            *m = !*m;
        }
        out
    }
}
