// Copyright @yucwang 2026

use crate::core::emitter::{Emitter, EmitterSample};
use crate::core::texture::Texture;
use crate::math::constants::{Float, Vector2f, Vector3f, INV_PI, INV_TWO_PI, PI, TWO_PI};
use crate::math::distribution::{bin_mass, build_cdf_in_place, sample_cdf};
use crate::math::spectrum::RGBSpectrum;
use crate::textures::image::{FilterMode, ImageTexture, WrapMode};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvMapConfig {
    /// Rotation of the panorama around +Y, in turns.
    pub azimuth_offset: Float,
    /// Filter used when fetching radiance at a sampled or looked-up UV.
    pub filter_mode: FilterMode,
}

impl Default for EnvMapConfig {
    fn default() -> Self {
        Self { azimuth_offset: 0.0, filter_mode: FilterMode::Bilinear }
    }
}

impl EnvMapConfig {
    pub fn with_azimuth_offset(self, azimuth_offset: Float) -> Self {
        Self { azimuth_offset, ..self }
    }

    pub fn with_filter_mode(self, filter_mode: FilterMode) -> Self {
        Self { filter_mode, ..self }
    }
}

/// Infinite-area light backed by an equirectangular panorama.
///
/// Columns map to azimuth and rows to the polar angle measured from +Y.
/// Directions are drawn from a marginal table over rows (intensity times
/// `sin(phi)`) followed by a conditional table over the columns of the chosen
/// row. Tables are immutable between `build` and `release`, so `sample` can
/// run from many threads at once.
pub struct EnvironmentLight {
    config: EnvMapConfig,
    texture: ImageTexture,
    width: usize,
    height: usize,
    row_marginal_cdf: Vec<Float>,
    col_conditional_cdf: Vec<Float>,
}

impl Default for EnvironmentLight {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentLight {
    pub fn new() -> Self {
        Self::with_config(EnvMapConfig::default())
    }

    pub fn with_config(config: EnvMapConfig) -> Self {
        Self {
            config,
            texture: ImageTexture::empty(),
            width: 0,
            height: 0,
            row_marginal_cdf: Vec::new(),
            col_conditional_cdf: Vec::new(),
        }
    }

    pub fn from_file(path: &str, config: EnvMapConfig) -> std::result::Result<Self, String> {
        let mut light = Self::with_config(config);
        light.build(path)?;
        Ok(light)
    }

    /// Loads the panorama at `path` and rebuilds both importance tables.
    /// On failure the light keeps its previous state.
    pub fn build(&mut self, path: &str) -> std::result::Result<(), String> {
        log::info!("Building environment light from: {}.", path);
        let texture = ImageTexture::from_file(path)
            .map_err(|e| format!("failed to build environment light: {}", e))?;
        self.build_from_texture(texture)
    }

    pub fn build_from_texture(&mut self, mut texture: ImageTexture) -> std::result::Result<(), String> {
        let (width, height) = texture.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("envmap has invalid resolution: {}x{}", width, height));
        }
        texture.set_filter_mode(self.config.filter_mode);
        texture.set_wrap_mode(WrapMode::Repeat, WrapMode::Clamp);

        // Radiance must be finite and non-negative wherever a filtered fetch
        // can land, not just in the tables.
        let clamped = texture.sanitize();

        // Intensities are taken relative to the brightest channel so row sums
        // stay finite for panoramas close to the float range.
        let peak = texture.peak();
        let scale = if peak > 0.0 { peak } else { 1.0 };

        let mut row_marginal_cdf = vec![0.0; height];
        let mut col_conditional_cdf = vec![0.0; width * height];
        let mut dark_rows = 0usize;

        for (y, row) in col_conditional_cdf.chunks_mut(width).enumerate() {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = (texture.rgb(x, y) / scale).norm();
            }

            let sin_phi = (PI * (y as Float + 0.5) / height as Float).sin();

            // Rows without energy get a uniform ramp; their marginal mass is
            // zero so sampling never lands on them.
            let hsum = build_cdf_in_place(row);
            if hsum == 0.0 {
                dark_rows += 1;
            }
            row_marginal_cdf[y] = hsum * sin_phi;
        }

        let vsum = build_cdf_in_place(&mut row_marginal_cdf);

        if clamped > 0 {
            log::warn!("Environment map has {} negative or non-finite texels, clamped to zero.", clamped);
        }
        if vsum == 0.0 {
            log::warn!("Environment map carries no radiance, sampling falls back to uniform rows.");
        } else if dark_rows > 0 {
            log::warn!("Environment map has {} of {} rows without radiance.", dark_rows, height);
        }
        log::debug!("Environment importance total = {} (peak {}) over {}.", vsum, peak, texture.describe());
        log::info!("Environment light built, width = {}, height = {}.", width, height);

        self.texture = texture;
        self.width = width;
        self.height = height;
        self.row_marginal_cdf = row_marginal_cdf;
        self.col_conditional_cdf = col_conditional_cdf;
        Ok(())
    }

    /// Drops the panorama and tables. The light can be rebuilt afterwards.
    pub fn release(&mut self) {
        self.texture = ImageTexture::empty();
        self.width = 0;
        self.height = 0;
        self.row_marginal_cdf = Vec::new();
        self.col_conditional_cdf = Vec::new();
    }

    pub fn is_built(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn config(&self) -> &EnvMapConfig {
        &self.config
    }

    pub fn texture(&self) -> &ImageTexture {
        &self.texture
    }

    pub fn row_marginal_cdf(&self) -> &[Float] {
        &self.row_marginal_cdf
    }

    pub fn col_conditional_cdf(&self) -> &[Float] {
        &self.col_conditional_cdf
    }

    pub fn conditional_cdf(&self, row: usize) -> &[Float] {
        &self.col_conditional_cdf[row * self.width..(row + 1) * self.width]
    }

    /// Draws a direction from the 2D uniform sample `u` (x picks the column,
    /// y the row).
    ///
    /// The returned radiance is the fetched color divided by the joint bin
    /// probability and the texel count, i.e. by the density of the draw over
    /// the unit UV square.
    pub fn sample(&self, u: &Vector2f) -> EmitterSample {
        let empty = EmitterSample {
            direction: Vector3f::new(0.0, 1.0, 0.0),
            radiance: RGBSpectrum::default(),
            uv: Vector2f::zeros(),
            pdf: 0.0,
        };
        if !self.is_built() {
            return empty;
        }

        let row = match sample_cdf(&self.row_marginal_cdf, u.y) {
            Some(s) => s,
            None => return empty,
        };
        let col = match sample_cdf(self.conditional_cdf(row.index), u.x) {
            Some(s) => s,
            None => return empty,
        };

        let pixel_count = (self.width * self.height) as Float;
        let uv = Vector2f::new(col.offset / self.width as Float, row.offset / self.height as Float);
        let color = self.texture.eval(uv);
        let radiance = color / (col.mass * row.mass * pixel_count);

        let direction = self.direction_from_uv(uv);
        let pdf = solid_angle_pdf(col.mass * row.mass * pixel_count, direction.y);

        EmitterSample { direction, radiance, uv, pdf }
    }

    /// Radiance arriving along `direction`.
    pub fn eval_direction(&self, direction: &Vector3f) -> RGBSpectrum {
        if !self.is_built() {
            return RGBSpectrum::default();
        }
        match self.uv_from_direction(direction) {
            Some(uv) => self.texture.eval(uv),
            None => RGBSpectrum::default(),
        }
    }

    /// Solid-angle density with which `sample` produces `direction`.
    pub fn pdf_direction(&self, direction: &Vector3f) -> Float {
        if !self.is_built() {
            return 0.0;
        }
        let uv = match self.uv_from_direction(direction) {
            Some(uv) => uv,
            None => return 0.0,
        };

        let x = ((uv.x * self.width as Float) as usize).min(self.width - 1);
        let y = ((uv.y * self.height as Float) as usize).min(self.height - 1);
        let mass = bin_mass(&self.row_marginal_cdf, y) * bin_mass(self.conditional_cdf(y), x);
        if !(mass > 0.0) {
            return 0.0;
        }

        let pixel_count = (self.width * self.height) as Float;
        let cos_phi = direction.y / direction.norm();
        solid_angle_pdf(mass * pixel_count, cos_phi)
    }

    fn direction_from_uv(&self, uv: Vector2f) -> Vector3f {
        let theta = TWO_PI * (uv.x + self.config.azimuth_offset);
        let phi = PI * uv.y;
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        Vector3f::new(cos_theta * sin_phi, cos_phi, sin_theta * sin_phi).normalize()
    }

    fn uv_from_direction(&self, d: &Vector3f) -> Option<Vector2f> {
        let len = d.norm();
        if !(len > 0.0) {
            return None;
        }
        let d = d / len;
        let phi = d.y.clamp(-1.0, 1.0).acos();
        let theta = d.z.atan2(d.x);
        let u = (theta * INV_TWO_PI - self.config.azimuth_offset).rem_euclid(1.0);
        Some(Vector2f::new(u, phi * INV_PI))
    }
}

// Converts a density over the unit UV square into one over solid angle.
fn solid_angle_pdf(pdf_uv: Float, cos_phi: Float) -> Float {
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    if sin_phi <= 0.0 {
        return 0.0;
    }
    pdf_uv / (2.0 * PI * PI * sin_phi)
}

impl Emitter for EnvironmentLight {
    fn sample_direction(&self, u: &Vector2f) -> EmitterSample {
        self.sample(u)
    }

    fn eval_direction(&self, direction: &Vector3f) -> RGBSpectrum {
        EnvironmentLight::eval_direction(self, direction)
    }

    fn pdf_direction(&self, direction: &Vector3f) -> Float {
        EnvironmentLight::pdf_direction(self, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvMapConfig, EnvironmentLight};
    use crate::core::emitter::Emitter;
    use crate::core::rng::LcgRng;
    use crate::math::constants::{Float, Vector2f, Vector3f, Vector4f, ONE_MINUS_EPSILON, PI};
    use crate::textures::image::{FilterMode, ImageTexture};

    fn light_from<F>(width: usize, height: usize, config: EnvMapConfig, f: F) -> EnvironmentLight
    where
        F: Fn(usize, usize) -> Vector4f,
    {
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        let texture = ImageTexture::from_texels(width, height, texels).unwrap();
        let mut light = EnvironmentLight::with_config(config);
        light.build_from_texture(texture).unwrap();
        light
    }

    fn noisy_light(config: EnvMapConfig) -> EnvironmentLight {
        let mut rng = LcgRng::new(42);
        let values: Vec<Vector4f> = (0..16 * 8)
            .map(|_| Vector4f::new(0.1 + 2.0 * rng.next_f32(), 0.1 + rng.next_f32(), 0.1 + 4.0 * rng.next_f32(), 1.0))
            .collect();
        light_from(16, 8, config, |x, y| values[x + y * 16])
    }

    #[test]
    fn test_tables_are_monotone_and_normalized() {
        let light = noisy_light(EnvMapConfig::default());
        let marginal = light.row_marginal_cdf();
        assert_eq!(marginal.len(), 8);
        assert!(marginal.windows(2).all(|w| w[0] <= w[1]));
        assert!((marginal[7] - 1.0).abs() < 1e-5);

        assert_eq!(light.col_conditional_cdf().len(), 16 * 8);
        for y in 0..8 {
            let row = light.conditional_cdf(y);
            assert!(row.windows(2).all(|w| w[0] <= w[1]), "row {}", y);
            assert!((row[15] - 1.0).abs() < 1e-5, "row {}", y);
        }
    }

    #[test]
    fn test_samples_are_unit_and_finite() {
        let light = noisy_light(EnvMapConfig::default());
        let mut rng = LcgRng::new(3);
        let mut us: Vec<Vector2f> = (0..2000).map(|_| rng.next_2d()).collect();
        us.push(Vector2f::new(0.0, 0.0));
        us.push(Vector2f::new(ONE_MINUS_EPSILON, ONE_MINUS_EPSILON));
        us.push(Vector2f::new(1.0, 1.0));

        for u in us.iter() {
            let s = light.sample(u);
            assert!((s.direction.norm() - 1.0).abs() < 1e-5, "u = {:?}", u);
            assert!(s.radiance.is_finite(), "u = {:?}", u);
            assert!(s.radiance.min_component() >= 0.0, "u = {:?}", u);
            assert!(s.uv.x >= 0.0 && s.uv.x < 1.0 && s.uv.y >= 0.0 && s.uv.y < 1.0);
        }
    }

    #[test]
    fn test_sample_is_pure() {
        let light = noisy_light(EnvMapConfig::default());
        let u = Vector2f::new(0.37, 0.81);
        assert_eq!(light.sample(&u), light.sample(&u));
        assert_eq!(light.sample_direction(&u), light.sample(&u));
    }

    #[test]
    fn test_uniform_image_samples_sphere_uniformly() {
        let light = light_from(64, 32, EnvMapConfig::default(), |_, _| Vector4f::new(1.0, 1.0, 1.0, 1.0));

        const BANDS: usize = 8;
        const SECTORS: usize = 8;
        let (nx, ny) = (64usize, 1024usize);
        let mut counts = vec![0usize; BANDS * SECTORS];
        for j in 0..ny {
            for i in 0..nx {
                let u = Vector2f::new((i as Float + 0.5) / nx as Float, (j as Float + 0.5) / ny as Float);
                let d = light.sample(&u).direction;
                // Equal-area bins: uniform in cos(polar) and in azimuth.
                let band = (((d.y + 1.0) * 0.5 * BANDS as Float) as usize).min(BANDS - 1);
                let azimuth = d.z.atan2(d.x) / (2.0 * std::f32::consts::PI) + 0.5;
                let sector = ((azimuth * SECTORS as Float) as usize).min(SECTORS - 1);
                counts[band * SECTORS + sector] += 1;
            }
        }

        let expected = (nx * ny) as Float / (BANDS * SECTORS) as Float;
        let chi2: Float = counts
            .iter()
            .map(|c| {
                let diff = *c as Float - expected;
                diff * diff / expected
            })
            .sum();
        // 63 degrees of freedom; 90 is well past the 97th percentile.
        assert!(chi2 < 90.0, "chi2 = {}, counts = {:?}", chi2, counts);
    }

    #[test]
    fn test_dark_row_is_never_selected() {
        let light = light_from(4, 2, EnvMapConfig::default(), |_, y| {
            if y == 0 { Vector4f::new(1.0, 0.0, 0.0, 1.0) } else { Vector4f::zeros() }
        });

        let marginal = light.row_marginal_cdf();
        assert_eq!(marginal[1], marginal[0]);
        assert!((marginal[0] - 1.0).abs() < 1e-6);

        let mut uys: Vec<Float> = (0..1000).map(|i| i as Float / 1000.0).collect();
        uys.push(ONE_MINUS_EPSILON);
        for uy in uys {
            for ux in [0.0, 0.3, 0.9, ONE_MINUS_EPSILON].iter() {
                let s = light.sample(&Vector2f::new(*ux, uy));
                assert!(s.uv.y < 0.5, "u.y = {} picked row 1", uy);
                assert!(s.direction.y >= -1e-6);
                assert!(s.radiance.is_finite());
            }
        }
    }

    #[test]
    fn test_weighted_radiance_estimates_image_mean() {
        let config = EnvMapConfig::default().with_filter_mode(FilterMode::Nearest);
        let light = light_from(8, 4, config, |x, y| {
            Vector4f::new(1.0 + x as Float * 0.25, 0.5 + y as Float * 0.5, 2.0 - x as Float * 0.2, 1.0)
        });

        let mut mean = [0.0f64; 3];
        for y in 0..4 {
            for x in 0..8 {
                mean[0] += (1.0 + x as f64 * 0.25) / 32.0;
                mean[1] += (0.5 + y as f64 * 0.5) / 32.0;
                mean[2] += (2.0 - x as f64 * 0.2) / 32.0;
            }
        }

        let n = 512usize;
        let mut estimate = [0.0f64; 3];
        for j in 0..n {
            for i in 0..n {
                let u = Vector2f::new((i as Float + 0.5) / n as Float, (j as Float + 0.5) / n as Float);
                let s = light.sample(&u);
                for c in 0..3 {
                    estimate[c] += s.radiance[c] as f64 / (n * n) as f64;
                }
            }
        }

        for c in 0..3 {
            let rel = (estimate[c] - mean[c]).abs() / mean[c];
            assert!(rel < 0.05, "channel {}: estimate {} vs mean {}", c, estimate[c], mean[c]);
        }
    }

    #[test]
    fn test_pdf_and_eval_agree_with_sample() {
        let config = EnvMapConfig::default().with_filter_mode(FilterMode::Nearest).with_azimuth_offset(0.25);
        let light = noisy_light(config);
        let mut rng = LcgRng::new(11);
        let mut checked = 0;
        for _ in 0..500 {
            let s = light.sample(&rng.next_2d());
            let fx = s.uv.x * 16.0 - (s.uv.x * 16.0).floor();
            let fy = s.uv.y * 8.0 - (s.uv.y * 8.0).floor();
            if fx < 1e-3 || fx > 1.0 - 1e-3 || fy < 1e-3 || fy > 1.0 - 1e-3 {
                continue;
            }
            checked += 1;

            let pdf = light.pdf_direction(&s.direction);
            assert!(s.pdf > 0.0);
            assert!((pdf - s.pdf).abs() / s.pdf < 1e-2, "pdf {} vs sampled {}", pdf, s.pdf);

            // Undo the weighting: radiance = color / pdf_uv.
            let sin_phi = (1.0 - s.direction.y * s.direction.y).max(0.0).sqrt();
            let pdf_uv = s.pdf * 2.0 * PI * PI * sin_phi;
            let seen = light.eval_direction(&s.direction);
            let fetched = s.radiance * pdf_uv;
            assert!((seen.as_vector() - fetched.as_vector()).norm() < 1e-3 * (1.0 + seen.norm()));
        }
        assert!(checked > 400);
    }

    #[test]
    fn test_azimuth_offset_rotates_about_y() {
        let light = noisy_light(EnvMapConfig::default());
        let turned = noisy_light(EnvMapConfig::default().with_azimuth_offset(0.5));
        let u = Vector2f::new(0.2, 0.6);
        let a = light.sample(&u);
        let b = turned.sample(&u);
        assert_eq!(a.uv, b.uv);
        assert!((a.direction.x + b.direction.x).abs() < 1e-5);
        assert!((a.direction.y - b.direction.y).abs() < 1e-6);
        assert!((a.direction.z + b.direction.z).abs() < 1e-5);
    }

    #[test]
    fn test_black_image_samples_zero_radiance() {
        let light = light_from(8, 4, EnvMapConfig::default(), |_, _| Vector4f::zeros());
        assert!(light.row_marginal_cdf().iter().all(|c| c.is_finite()));
        let s = light.sample(&Vector2f::new(0.5, 0.5));
        assert!(s.radiance.is_black());
        assert!((s.direction.norm() - 1.0).abs() < 1e-5);
        assert!(light.pdf_direction(&s.direction) > 0.0);
    }

    fn grid(n: usize) -> Vec<Vector2f> {
        let mut us = Vec::with_capacity(n * n);
        for j in 0..n {
            for i in 0..n {
                us.push(Vector2f::new((i as Float + 0.5) / n as Float, (j as Float + 0.5) / n as Float));
            }
        }
        us
    }

    #[test]
    fn test_infinite_texel_does_not_leak_into_radiance() {
        let light = light_from(8, 4, EnvMapConfig::default(), |x, y| {
            if (x, y) == (2, 1) { Vector4f::new(Float::INFINITY, 0.0, 0.0, 1.0) } else { Vector4f::new(1.0, 1.0, 1.0, 1.0) }
        });

        for u in grid(64).iter() {
            let s = light.sample(u);
            assert!(s.radiance.is_finite(), "u = {:?} gave {:?}", u, s.radiance);
            assert!(light.eval_direction(&s.direction).is_finite());
        }
        assert!(light.texture().rgb(2, 1).is_black());
    }

    #[test]
    fn test_negative_texel_never_gives_negative_radiance() {
        let light = light_from(4, 2, EnvMapConfig::default(), |x, y| {
            if (x, y) == (1, 0) { Vector4f::new(-2.0, 0.0, 0.0, 1.0) } else { Vector4f::new(1.0, 1.0, 1.0, 1.0) }
        });

        for u in grid(32).iter() {
            let s = light.sample(u);
            assert!(s.radiance.min_component() >= 0.0, "u = {:?} gave {:?}", u, s.radiance);
        }
        assert_eq!(bin_mass_of(&light, 0, 1), 0.0);
    }

    fn bin_mass_of(light: &EnvironmentLight, row: usize, col: usize) -> Float {
        crate::math::distribution::bin_mass(light.conditional_cdf(row), col)
    }

    #[test]
    fn test_huge_texels_keep_tables_and_radiance_finite() {
        let light = light_from(4, 2, EnvMapConfig::default(), |_, _| Vector4f::new(1e38, 1e38, 1e38, 1.0));

        let marginal = light.row_marginal_cdf();
        assert!((marginal[0] - 0.5).abs() < 1e-5, "marginal = {:?}", marginal);
        assert!((marginal[1] - 1.0).abs() < 1e-5);

        for u in grid(16).iter() {
            let s = light.sample(u);
            assert!(s.radiance.is_finite(), "u = {:?} gave {:?}", u, s.radiance);
            assert!((s.radiance.r() / 1e38 - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_unbuilt_light_is_inert() {
        let light = EnvironmentLight::new();
        assert!(!light.is_built());
        let s = light.sample(&Vector2f::new(0.5, 0.5));
        assert!(s.radiance.is_black());
        assert_eq!(s.pdf, 0.0);
        assert_eq!(light.pdf_direction(&Vector3f::new(0.0, 1.0, 0.0)), 0.0);
        assert!(light.eval_direction(&Vector3f::new(1.0, 0.0, 0.0)).is_black());
    }

    #[test]
    fn test_build_from_exr_and_release() {
        let path = std::env::temp_dir().join(format!("envlight_build_{}.exr", std::process::id()));
        let path = path.to_str().unwrap().to_string();
        exr::prelude::write_rgb_file(&path, 8, 4, |x, y| {
            (0.5 + x as f32 * 0.1, 0.25 * (y + 1) as f32, 1.0)
        }).unwrap();

        let mut light = EnvironmentLight::new();
        let built = light.build(&path);
        let _ = std::fs::remove_file(&path);
        built.unwrap();

        assert!(light.is_built());
        assert_eq!((light.width(), light.height()), (8, 4));
        assert!((light.row_marginal_cdf()[3] - 1.0).abs() < 1e-5);
        let s = light.sample(&Vector2f::new(0.5, 0.5));
        assert!(!s.radiance.is_black());

        light.release();
        assert!(!light.is_built());
        assert_eq!((light.width(), light.height()), (0, 0));
        assert!(light.row_marginal_cdf().is_empty());
        assert!(light.col_conditional_cdf().is_empty());
        assert!(light.sample(&Vector2f::new(0.5, 0.5)).radiance.is_black());
    }

    #[test]
    fn test_build_missing_file_fails() {
        let mut light = EnvironmentLight::new();
        assert!(light.build("/nonexistent/sky.exr").is_err());
        assert!(!light.is_built());
        assert!(EnvironmentLight::from_file("/nonexistent/sky.hdr", EnvMapConfig::default()).is_err());
    }

    #[test]
    fn test_concurrent_sampling_matches_serial() {
        let light = noisy_light(EnvMapConfig::default());
        let mut rng = LcgRng::new(5);
        let us: Vec<Vector2f> = (0..256).map(|_| rng.next_2d()).collect();
        let serial: Vec<_> = us.iter().map(|u| light.sample(u)).collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| us.iter().map(|u| light.sample(u)).collect::<Vec<_>>()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), serial);
            }
        });
    }
}
