// Copyright @yucwang 2026

use crate::math::constants::{Float, Vector2f, Vector3f};
use crate::math::spectrum::RGBSpectrum;

/// A direction drawn from an emitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterSample {
    /// Unit direction towards the emitter.
    pub direction: Vector3f,
    /// Radiance divided by the sampling density of the draw.
    pub radiance: RGBSpectrum,
    /// Position of the draw in the emitter's 2D parameterization.
    pub uv: Vector2f,
    /// Solid-angle density of `direction`, zero when undefined.
    pub pdf: Float,
}

pub trait Emitter: Send + Sync {
    fn sample_direction(&self, u: &Vector2f) -> EmitterSample;
    fn eval_direction(&self, direction: &Vector3f) -> RGBSpectrum;
    fn pdf_direction(&self, direction: &Vector3f) -> Float;
}
