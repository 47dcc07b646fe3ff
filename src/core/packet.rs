// Copyright @yucwang 2026

use crate::math::constants::{Float, Vector3f};
use crate::math::lanes::{lane_float, LaneFloat, LaneMask, LaneVector3f, LANE_WIDTH};
use crate::math::ray::Ray;

/// `LANE_WIDTH` rays in structure-of-arrays form.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayLane {
    pub origin: LaneVector3f,
    pub dir: LaneVector3f,
    pub inv_dir: LaneVector3f,
    pub max_t: LaneFloat,
    pub swap_xz: LaneMask,
    pub swap_yz: LaneMask,
}

impl RayLane {
    /// Vectorized `Ray::prepare`. Must run after `origin` and `dir` are
    /// populated and before the lanes reach traversal.
    pub fn prepare(&mut self) {
        self.inv_dir = self.dir.recip();

        let abs_d = self.dir.abs();
        let max_e = abs_d.max_element();
        let mask_x = LaneMask::equal(max_e, abs_d.x);
        let mask_y = LaneMask::equal(max_e, abs_d.y) & !mask_x;

        self.swap_xz = mask_x;
        self.swap_yz = mask_y;
    }

    pub fn ray(&self, i: usize) -> Ray {
        Ray {
            origin: self.origin.lane(i),
            dir: self.dir.lane(i),
            inv_dir: self.inv_dir.lane(i),
            max_t: lane_float(self.max_t, i),
            swap_xz: self.swap_xz.lane(i),
            swap_yz: self.swap_yz.lane(i),
        }
    }
}

/// A fixed batch of `G * LANE_WIDTH` rays grouped by lane width.
#[derive(Clone, Copy, Debug)]
pub struct RayLaneBatch<const G: usize = 2> {
    pub rays: [RayLane; G],
    pub avg_dir: Vector3f,
}

impl<const G: usize> Default for RayLaneBatch<G> {
    fn default() -> Self {
        Self { rays: [RayLane::default(); G], avg_dir: Vector3f::zeros() }
    }
}

impl<const G: usize> RayLaneBatch<G> {
    pub const SIZE: usize = G * LANE_WIDTH;

    /// Loads exactly `SIZE` origins and directions.
    pub fn new(origins: &[Vector3f], dirs: &[Vector3f]) -> std::result::Result<Self, String> {
        if origins.len() != Self::SIZE || dirs.len() != Self::SIZE {
            return Err(format!("ray batch needs {} origins and directions, got {} and {}",
                               Self::SIZE, origins.len(), dirs.len()));
        }

        let mut batch = Self::default();
        for (i, lane) in batch.rays.iter_mut().enumerate() {
            let range = i * LANE_WIDTH..(i + 1) * LANE_WIDTH;
            lane.origin = LaneVector3f::from_slice(&origins[range.clone()]);
            lane.dir = LaneVector3f::from_slice(&dirs[range]);
            lane.max_t = LaneFloat::splat(Float::MAX);
        }
        Ok(batch)
    }

    pub fn set_max_t(&mut self, max_t: Float) {
        for lane in self.rays.iter_mut() {
            lane.max_t = LaneFloat::splat(max_t);
        }
    }

    /// Prepares every lane group and refreshes the cached average direction.
    pub fn prepare(&mut self) {
        let mut sum = Vector3f::zeros();
        for lane in self.rays.iter_mut() {
            lane.prepare();
            for i in 0..LANE_WIDTH {
                sum += lane.dir.lane(i);
            }
        }

        let len = sum.norm();
        self.avg_dir = if len > 0.0 { sum / len } else { Vector3f::zeros() };
    }

    pub fn ray(&self, index: usize) -> Ray {
        self.rays[index / LANE_WIDTH].ray(index % LANE_WIDTH)
    }
}

/// One-ray counterpart of `RayLaneBatch`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleRayPacket {
    pub ray: Ray,
}

impl SingleRayPacket {
    pub fn new(ray: Ray) -> Self {
        Self { ray }
    }
}
