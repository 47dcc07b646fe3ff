// Copyright @yucwang 2026

//! Piecewise-constant 1D distributions stored as cumulative tables.
//!
//! A table of `n` entries describes `n` bins. Bin `i` spans
//! `[cdf[i - 1], cdf[i])` with an implicit `cdf[-1] = 0`, so its probability
//! mass is `cdf[i] - cdf[i - 1]`.

use super::constants::{Float, ONE_MINUS_EPSILON};

/// Result of inverting a cumulative table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CdfSample {
    /// Selected bin.
    pub index: usize,
    /// Continuous coordinate in `[index, index + 1)`.
    pub offset: Float,
    /// Probability mass of the selected bin.
    pub mass: Float,
}

/// Turns per-bin weights into a normalized running sum in place and returns
/// the weight total. A table whose total is zero becomes a uniform ramp.
pub fn build_cdf_in_place(values: &mut [Float]) -> Float {
    let sum: Float = values.iter().sum();
    if !(sum > 0.0) {
        let n = values.len() as Float;
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as Float + 1.0) / n;
        }
        return 0.0;
    }

    let inv_sum = 1.0 / sum;
    let mut accum = 0.0;
    for v in values.iter_mut() {
        accum += inv_sum * *v;
        *v = accum;
    }
    sum
}

pub fn bin_mass(cdf: &[Float], index: usize) -> Float {
    let prev = if index == 0 { 0.0 } else { cdf[index - 1] };
    cdf[index] - prev
}

/// Picks the first bin whose cumulative value exceeds `u`.
///
/// Zero-mass bins can never satisfy `prev <= u < cdf[i]`, so they are skipped
/// without an explicit test. When rounding leaves `u` at or above the final
/// entry, the last bin with positive mass is returned at its upper edge.
pub fn sample_cdf(cdf: &[Float], u: Float) -> Option<CdfSample> {
    if cdf.is_empty() {
        return None;
    }

    let u = u.max(0.0).min(ONE_MINUS_EPSILON);
    let index = cdf.partition_point(|c| *c <= u);
    if index < cdf.len() {
        let prev = if index == 0 { 0.0 } else { cdf[index - 1] };
        let mass = cdf[index] - prev;
        let frac = ((u - prev) / mass).max(0.0);
        let offset = (index as Float + frac).min(upper_edge(index));
        return Some(CdfSample { index, offset, mass });
    }

    let index = (0..cdf.len()).rev().find(|i| bin_mass(cdf, *i) > 0.0)?;
    Some(CdfSample {
        index,
        offset: upper_edge(index),
        mass: bin_mass(cdf, index),
    })
}

// Largest coordinate still inside bin `index`.
fn upper_edge(index: usize) -> Float {
    (index + 1) as Float * ONE_MINUS_EPSILON
}
