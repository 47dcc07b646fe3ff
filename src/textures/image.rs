// Copyright @yucwang 2026

use crate::core::texture::Texture;
use crate::math::constants::{Float, Vector2f, Vector4f};
use crate::math::spectrum::RGBSpectrum;
use exr::prelude::*;
use image::io::Reader as ImageReader;
use image::GenericImageView;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Bilinear,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    Mirror,
    Clamp,
}

/// RGBA float texels, row-major with row 0 at `v = 0`.
pub struct ImageTexture {
    width: usize,
    height: usize,
    texels: Vec<Vector4f>,
    filter_mode: FilterMode,
    wrap_u: WrapMode,
    wrap_v: WrapMode,
}

fn srgb_to_linear(v: Float) -> Float {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

impl ImageTexture {
    /// An image with no texels. Sampling it yields black.
    pub fn empty() -> Self {
        Self::from_parts(0, 0, Vec::new())
    }

    pub fn from_texels(width: usize, height: usize, texels: Vec<Vector4f>)
        -> std::result::Result<Self, String> {
        if width == 0 || height == 0 {
            return Err(format!("image has invalid resolution: {}x{}", width, height));
        }
        if texels.len() != width * height {
            return Err(format!("expected {} texels for a {}x{} image, got {}",
                               width * height, width, height, texels.len()));
        }
        Ok(Self::from_parts(width, height, texels))
    }

    pub fn from_exr(path: &str) -> std::result::Result<Self, String> {
        let image = read()
            .no_deep_data()
            .largest_resolution_level()
            .rgba_channels(
                |resolution, _| {
                    let width = resolution.width();
                    let height = resolution.height();
                    ImageTexture::from_parts(width, height, vec![Vector4f::zeros(); width * height])
                },
                |image, position, (r, g, b, a): (f32, f32, f32, f32)| {
                    let index = position.x() + position.y() * image.width;
                    image.texels[index] = Vector4f::new(r, g, b, a);
                },
            )
            .first_valid_layer()
            .all_attributes()
            .from_file(path)
            .map_err(|e| format!("failed to read exr {}: {}", path, e))?;

        let pixels = image.layer_data.channel_data.pixels;
        log::info!("OpenEXR loaded, width = {}, height = {}.", pixels.width, pixels.height);
        Self::from_texels(pixels.width, pixels.height, pixels.texels)
    }

    pub fn from_image(path: &str, srgb: bool) -> std::result::Result<Self, String> {
        let img = ImageReader::open(path)
            .map_err(|e| format!("failed to open image {}: {}", path, e))?
            .decode()
            .map_err(|e| format!("failed to decode image {}: {}", path, e))?;

        let (width, height) = img.dimensions();
        let rgba = img.to_rgba32f();
        let mut texels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let p = rgba.get_pixel(x, y);
                let (mut r, mut g, mut b) = (p[0], p[1], p[2]);
                if srgb {
                    r = srgb_to_linear(r);
                    g = srgb_to_linear(g);
                    b = srgb_to_linear(b);
                }
                texels.push(Vector4f::new(r, g, b, p[3]));
            }
        }

        log::info!("Image loaded: {}, width = {}, height = {}.", path, width, height);
        Self::from_texels(width as usize, height as usize, texels)
    }

    /// Picks the decoder from the file extension. Radiance HDR and EXR are
    /// read as linear data, 8-bit formats are decoded from sRGB.
    pub fn from_file(path: &str) -> std::result::Result<Self, String> {
        let ext = Path::new(path)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "exr" => Self::from_exr(path),
            "hdr" => Self::from_image(path, false),
            "jpg" | "jpeg" | "png" => Self::from_image(path, true),
            _ => Err(format!("unsupported texture format: {}", ext)),
        }
    }

    fn from_parts(width: usize, height: usize, texels: Vec<Vector4f>) -> Self {
        Self {
            width,
            height,
            texels,
            filter_mode: FilterMode::Bilinear,
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn set_filter_mode(&mut self, filter_mode: FilterMode) {
        self.filter_mode = filter_mode;
    }

    pub fn set_wrap_mode(&mut self, wrap_u: WrapMode, wrap_v: WrapMode) {
        self.wrap_u = wrap_u;
        self.wrap_v = wrap_v;
    }

    /// Clamps every color channel that is negative or not finite to zero and
    /// returns how many texels were touched. Alpha is left alone.
    pub fn sanitize(&mut self) -> usize {
        let mut touched = 0;
        for t in self.texels.iter_mut() {
            let mut dirty = false;
            for c in 0..3 {
                if !(t[c] >= 0.0) || !t[c].is_finite() {
                    t[c] = 0.0;
                    dirty = true;
                }
            }
            if dirty {
                touched += 1;
            }
        }
        touched
    }

    /// Largest color channel over all texels.
    pub fn peak(&self) -> Float {
        self.texels
            .iter()
            .map(|t| t.x.max(t.y).max(t.z))
            .fold(0.0, Float::max)
    }

    pub fn texel(&self, x: usize, y: usize) -> Vector4f {
        self.texels[x + y * self.width]
    }

    pub fn rgb(&self, x: usize, y: usize) -> RGBSpectrum {
        let t = self.texel(x, y);
        RGBSpectrum::new(t.x, t.y, t.z)
    }

    fn sample_bilinear(&self, uv: Vector2f) -> RGBSpectrum {
        if self.width == 0 || self.height == 0 {
            return RGBSpectrum::default();
        }

        let x = wrap_coord(uv.x, self.wrap_u) * (self.width as Float) - 0.5;
        let y = wrap_coord(uv.y, self.wrap_v) * (self.height as Float) - 0.5;

        let x0 = x.floor() as isize;
        let y0 = y.floor() as isize;
        let tx = x - x0 as Float;
        let ty = y - y0 as Float;

        let x0u = wrap_index(x0, self.width, self.wrap_u);
        let x1u = wrap_index(x0 + 1, self.width, self.wrap_u);
        let y0u = wrap_index(y0, self.height, self.wrap_v);
        let y1u = wrap_index(y0 + 1, self.height, self.wrap_v);

        let c0 = self.rgb(x0u, y0u) * (1.0 - tx) + self.rgb(x1u, y0u) * tx;
        let c1 = self.rgb(x0u, y1u) * (1.0 - tx) + self.rgb(x1u, y1u) * tx;
        c0 * (1.0 - ty) + c1 * ty
    }

    fn sample_nearest(&self, uv: Vector2f) -> RGBSpectrum {
        if self.width == 0 || self.height == 0 {
            return RGBSpectrum::default();
        }

        let x = (wrap_coord(uv.x, self.wrap_u) * (self.width as Float)).floor() as isize;
        let y = (wrap_coord(uv.y, self.wrap_v) * (self.height as Float)).floor() as isize;
        let xi = wrap_index(x, self.width, self.wrap_u);
        let yi = wrap_index(y, self.height, self.wrap_v);
        self.rgb(xi, yi)
    }
}

impl Texture for ImageTexture {
    fn describe(&self) -> String {
        format!("ImageTexture {}x{}", self.width, self.height)
    }

    fn eval(&self, uv: Vector2f) -> RGBSpectrum {
        match self.filter_mode {
            FilterMode::Bilinear => self.sample_bilinear(uv),
            FilterMode::Nearest => self.sample_nearest(uv),
        }
    }
}

fn wrap_coord(value: Float, mode: WrapMode) -> Float {
    match mode {
        WrapMode::Repeat => value.rem_euclid(1.0),
        WrapMode::Mirror => {
            let mut v = value.rem_euclid(2.0);
            if v > 1.0 {
                v = 2.0 - v;
            }
            v
        }
        WrapMode::Clamp => value.clamp(0.0, 1.0),
    }
}

fn wrap_index(idx: isize, size: usize, mode: WrapMode) -> usize {
    let n = size as isize;
    if n <= 0 {
        return 0;
    }
    match mode {
        WrapMode::Repeat => idx.rem_euclid(n) as usize,
        WrapMode::Clamp => idx.clamp(0, n - 1) as usize,
        WrapMode::Mirror => {
            if n == 1 {
                return 0;
            }
            let period = 2 * (n - 1);
            let mut i = idx.rem_euclid(period);
            if i >= n {
                i = period - i;
            }
            i as usize
        }
    }
}
