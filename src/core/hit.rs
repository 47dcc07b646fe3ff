// Copyright @yucwang 2026

use crate::core::packet::{RayLaneBatch, SingleRayPacket};
#[cfg(feature = "stats")]
use crate::core::stats::TraversalStats;
use crate::math::constants::{Float, UInt};
use crate::math::lanes::{
    lane_float, lane_uint, with_lane_float, with_lane_uint, LaneFloat, LaneMask, LaneUInt, LANE_WIDTH,
};
use crate::math::mask::BatchMask;

/// Hit distance reserved for "no intersection".
pub const MISS_T: Float = -1.0;

/// Intersection result, generic over scalar or lane storage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit<T, U> {
    pub t: T,
    // barycentric coordinate
    pub i: T,
    pub j: T,
    pub k: T,

    pub prim_id: U,
    pub mesh_id: U,
}

pub type HitRecord = Hit<Float, UInt>;
pub type HitLane = Hit<LaneFloat, LaneUInt>;

impl HitRecord {
    pub fn miss() -> Self {
        Self { t: MISS_T, i: 0.0, j: 0.0, k: 0.0, prim_id: 0, mesh_id: 0 }
    }

    pub fn is_hit(&self) -> bool {
        self.t != MISS_T
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::miss()
    }
}

impl HitLane {
    pub fn miss() -> Self {
        Self {
            t: LaneFloat::splat(MISS_T),
            i: LaneFloat::splat(0.0),
            j: LaneFloat::splat(0.0),
            k: LaneFloat::splat(0.0),
            prim_id: LaneUInt::splat(0),
            mesh_id: LaneUInt::splat(0),
        }
    }

    pub fn hit_mask(&self) -> LaneMask {
        LaneMask::not_equal(self.t, LaneFloat::splat(MISS_T))
    }

    pub fn record(&self, lane: usize) -> HitRecord {
        Hit {
            t: lane_float(self.t, lane),
            i: lane_float(self.i, lane),
            j: lane_float(self.j, lane),
            k: lane_float(self.k, lane),
            prim_id: lane_uint(self.prim_id, lane),
            mesh_id: lane_uint(self.mesh_id, lane),
        }
    }

    pub fn store(&mut self, lane: usize, hit: &HitRecord) {
        self.t = with_lane_float(self.t, lane, hit.t);
        self.i = with_lane_float(self.i, lane, hit.i);
        self.j = with_lane_float(self.j, lane, hit.j);
        self.k = with_lane_float(self.k, lane, hit.k);
        self.prim_id = with_lane_uint(self.prim_id, lane, hit.prim_id);
        self.mesh_id = with_lane_uint(self.mesh_id, lane, hit.mesh_id);
    }
}

impl Default for HitLane {
    fn default() -> Self {
        Self::miss()
    }
}

/// Hit slot for a `SingleRayPacket`.
///
/// Traversal only ever writes a `t` tighter than the ray's bound, so seeding
/// with `max_t` and demoting untouched slots afterwards separates hits from
/// misses. A hit exactly at `max_t` is reported as a miss.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleHitPacket {
    pub hit: HitRecord,

    #[cfg(feature = "stats")]
    pub stats: TraversalStats,
}

impl SingleHitPacket {
    pub fn generate_mask(&self) -> bool {
        self.hit.is_hit()
    }

    pub fn set_max_t(&mut self, packet: &SingleRayPacket) {
        self.hit.t = packet.ray.max_t;
    }

    pub fn set_miss_for_max_t(&mut self, packet: &SingleRayPacket) {
        if self.hit.t == packet.ray.max_t {
            self.hit.t = MISS_T;
        }
    }
}

/// Shadow-ray result for a `SingleRayPacket`: traversal only needs to know
/// whether anything lies within `max_t`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleOccludedPacket {
    pub occluded: bool,

    #[cfg(feature = "stats")]
    pub stats: TraversalStats,
}

impl SingleOccludedPacket {
    pub fn generate_mask(&self) -> bool {
        self.occluded
    }
}

/// Per-lane hits for a `RayLaneBatch` with the same group count.
#[derive(Clone, Copy, Debug)]
pub struct HitLaneBatch<const G: usize = 2> {
    pub hits: [HitLane; G],

    #[cfg(feature = "stats")]
    pub stats: TraversalStats,
}

impl<const G: usize> Default for HitLaneBatch<G> {
    fn default() -> Self {
        Self {
            hits: [HitLane::miss(); G],
            #[cfg(feature = "stats")]
            stats: TraversalStats::default(),
        }
    }
}

impl<const G: usize> HitLaneBatch<G> {
    /// Lanes that still hold a valid hit.
    pub fn generate_mask(&self) -> BatchMask<G> {
        let mut mask = BatchMask::<G>::all_false();
        for (m, hit) in mask.masks.iter_mut().zip(self.hits.iter()) {
            *m = hit.hit_mask();
        }
        mask
    }

    pub fn set_max_t(&mut self, packet: &RayLaneBatch<G>) {
        for (hit, ray) in self.hits.iter_mut().zip(packet.rays.iter()) {
            hit.t = ray.max_t;
        }
    }

    pub fn set_miss_for_max_t(&mut self, packet: &RayLaneBatch<G>) {
        for (hit, ray) in self.hits.iter_mut().zip(packet.rays.iter()) {
            let untouched = LaneMask::equal(hit.t, ray.max_t);
            hit.t = untouched.select(LaneFloat::splat(MISS_T), hit.t);
        }
    }

    pub fn record(&self, index: usize) -> HitRecord {
        self.hits[index / LANE_WIDTH].record(index % LANE_WIDTH)
    }

    pub fn store(&mut self, index: usize, hit: &HitRecord) {
        self.hits[index / LANE_WIDTH].store(index % LANE_WIDTH, hit);
    }
}
