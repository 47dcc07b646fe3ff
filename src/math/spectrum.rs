// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f};

use std::ops;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RGBSpectrum {
    rgb: Vector3f
}

impl Default for RGBSpectrum {
    fn default() -> Self {
        Self { rgb: Vector3f::new(0.0f32, 0.0f32, 0.0f32) }
    }
}

impl RGBSpectrum {
    pub fn new(r: Float, g: Float, b: Float) -> Self {
        Self { rgb: Vector3f::new(r, g, b) }
    }

    pub fn r(&self) -> Float {
        self.rgb.x
    }

    pub fn g(&self) -> Float {
        self.rgb.y
    }

    pub fn b(&self) -> Float {
        self.rgb.z
    }

    pub fn as_vector(&self) -> Vector3f {
        self.rgb
    }

    /// Euclidean length of the RGB triple. Used as the intensity proxy when
    /// building importance tables, not a perceptual luminance.
    pub fn norm(&self) -> Float {
        self.rgb.norm()
    }

    pub fn is_black(&self) -> bool {
        self.rgb.iter().all(|c| *c == 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.rgb.iter().all(|c| c.is_finite())
    }

    pub fn min_component(&self) -> Float {
        self.rgb.min()
    }
}

impl ops::Add for RGBSpectrum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { rgb: self.rgb + rhs.rgb }
    }
}

impl ops::AddAssign for RGBSpectrum {
    fn add_assign(&mut self, rhs: Self) {
        self.rgb += rhs.rgb;
    }
}

impl ops::Mul<Float> for RGBSpectrum {
    type Output = Self;

    fn mul(self, rhs: Float) -> Self {
        Self { rgb: self.rgb * rhs }
    }
}

impl ops::Div<Float> for RGBSpectrum {
    type Output = Self;

    fn div(self, rhs: Float) -> Self {
        Self { rgb: self.rgb / rhs }
    }
}

impl ops::Index<usize> for RGBSpectrum {
    type Output = Float;

    fn index(&self, index: usize) -> &Float {
        &self.rgb[index]
    }
}
