// Copyright @yucwang 2026

use crate::math::constants::Float;

use exr::prelude::*;

/// Writes row-major RGB triples as an OpenEXR image.
pub fn write_exr_to_file(image: &[(Float, Float, Float)],
                         width: usize,
                         height: usize,
                         file_path: &str) -> std::result::Result<(), String> {
    if image.len() != width * height {
        return Err(format!("expected {} pixels for a {}x{} image, got {}",
                           width * height, width, height, image.len()));
    }
    log::info!("Starting writing openexr images: {}.", file_path);

    write_rgb_file(file_path, width, height, |x, y| {
        image[y * width + x]
    }).map_err(|e| format!("failed to write exr {}: {}", file_path, e))?;

    log::info!("EXR written to: {}.", file_path);
    Ok(())
}
