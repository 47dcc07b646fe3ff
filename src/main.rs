// Copyright @yucwang 2026

use envlight::core::rng::LcgRng;
use envlight::emitters::envmap::{EnvMapConfig, EnvironmentLight};
use envlight::io::exr_utils;
use envlight::math::constants::Float;
use envlight::textures::image::FilterMode;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::{env, thread};

const CHUNK_SIZE: usize = 1 << 16;
const MAX_DENSITY_WIDTH: usize = 512;
const MAX_DENSITY_HEIGHT: usize = 256;

struct Options {
    panorama: String,
    samples: usize,
    seed: u64,
    azimuth_offset: Float,
    nearest: bool,
    density: Option<String>,
}

fn parse_args(args: &[String]) -> std::result::Result<Options, String> {
    let program = args.first().map(|s| s.as_str()).unwrap_or("envlight");
    let usage = format!(
        "Usage: {} <panorama> [--samples N] [--seed N] [--azimuth-offset X] [--nearest] [--density out.exr]",
        program
    );
    let panorama = match args.get(1) {
        Some(p) if !p.starts_with("--") => p.clone(),
        _ => return Err(usage),
    };

    let mut options = Options {
        panorama,
        samples: 1 << 20,
        seed: 0,
        azimuth_offset: 0.0,
        nearest: false,
        density: None,
    };

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i).cloned().ok_or_else(|| format!("missing value for {}", flag))
        };
        match flag {
            "--samples" => {
                let v = value()?;
                options.samples = v.parse::<usize>().map_err(|e| format!("invalid --samples {}: {}", v, e))?;
            }
            "--seed" => {
                let v = value()?;
                options.seed = v.parse::<u64>().map_err(|e| format!("invalid --seed {}: {}", v, e))?;
            }
            "--azimuth-offset" => {
                let v = value()?;
                options.azimuth_offset = v.parse::<Float>()
                    .map_err(|e| format!("invalid --azimuth-offset {}: {}", v, e))?;
            }
            "--density" => {
                options.density = Some(value()?);
            }
            "--nearest" => options.nearest = true,
            _ => return Err(format!("unknown argument: {}\n{}", flag, usage)),
        }
        i += 1;
    }

    if options.samples == 0 {
        return Err(String::from("--samples must be positive"));
    }
    Ok(options)
}

/// Per-chunk accumulators, merged on the main thread.
struct Tally {
    radiance: [f64; 3],
    zero_pdf: usize,
    density: Vec<u32>,
}

impl Tally {
    fn new(bins: usize) -> Self {
        Self { radiance: [0.0; 3], zero_pdf: 0, density: vec![0; bins] }
    }

    fn merge(&mut self, other: &Tally) {
        for c in 0..3 {
            self.radiance[c] += other.radiance[c];
        }
        self.zero_pdf += other.zero_pdf;
        for (a, b) in self.density.iter_mut().zip(other.density.iter()) {
            *a += *b;
        }
    }
}

fn run(options: &Options) -> std::result::Result<(), String> {
    let filter_mode = if options.nearest { FilterMode::Nearest } else { FilterMode::Bilinear };
    let config = EnvMapConfig::default()
        .with_azimuth_offset(options.azimuth_offset)
        .with_filter_mode(filter_mode);
    let light = EnvironmentLight::from_file(&options.panorama, config)?;

    let density_width = light.width().min(MAX_DENSITY_WIDTH);
    let density_height = light.height().min(MAX_DENSITY_HEIGHT);
    let bins = density_width * density_height;

    let total_chunks = (options.samples + CHUNK_SIZE - 1) / CHUNK_SIZE;
    let progress = ProgressBar::new(options.samples as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} samples")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let next_chunk = Arc::new(AtomicUsize::new(0));
    let thread_count = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let (tx, rx) = mpsc::channel::<(usize, Tally)>();
    let mut total = Tally::new(bins);
    let light_ref = &light;

    thread::scope(|scope| {
        for _ in 0..thread_count {
            let next_chunk = Arc::clone(&next_chunk);
            let tx = tx.clone();
            scope.spawn(move || {
                loop {
                    let chunk = next_chunk.fetch_add(1, Ordering::Relaxed);
                    if chunk >= total_chunks {
                        break;
                    }

                    let begin = chunk * CHUNK_SIZE;
                    let count = (begin + CHUNK_SIZE).min(options.samples) - begin;
                    let mut rng = LcgRng::new(((options.seed & 0xFFFF_FFFF) << 32) | chunk as u64);
                    let mut tally = Tally::new(bins);
                    for _ in 0..count {
                        let s = light_ref.sample(&rng.next_2d());
                        for c in 0..3 {
                            tally.radiance[c] += s.radiance[c] as f64;
                        }
                        if s.pdf <= 0.0 {
                            tally.zero_pdf += 1;
                        }
                        let x = ((s.uv.x * density_width as Float) as usize).min(density_width - 1);
                        let y = ((s.uv.y * density_height as Float) as usize).min(density_height - 1);
                        tally.density[x + y * density_width] += 1;
                    }
                    if tx.send((count, tally)).is_err() {
                        break;
                    }
                }
            });
        }

        drop(tx);
        for _ in 0..total_chunks {
            if let Ok((count, tally)) = rx.recv() {
                total.merge(&tally);
                progress.inc(count as u64);
            }
        }
    });
    progress.finish_and_clear();

    let (width, height) = light.texture().dimensions();
    let mut image_mean = [0.0f64; 3];
    for y in 0..height {
        for x in 0..width {
            let rgb = light.texture().rgb(x, y);
            for c in 0..3 {
                image_mean[c] += rgb[c] as f64;
            }
        }
    }

    let n = options.samples as f64;
    println!("Panorama: {} ({}x{})", options.panorama, width, height);
    println!("Samples: {} on {} threads", options.samples, thread_count);
    for (c, name) in ["R", "G", "B"].iter().enumerate() {
        let estimate = total.radiance[c] / n;
        let mean = image_mean[c] / (width * height) as f64;
        let rel = if mean > 0.0 { (estimate - mean) / mean } else { 0.0 };
        println!("{}: estimate = {:.6}, image mean = {:.6}, relative error = {:+.4}", name, estimate, mean, rel);
    }
    if total.zero_pdf > 0 {
        log::warn!("{} samples had zero solid-angle density.", total.zero_pdf);
    }

    if let Some(path) = &options.density {
        // Normalised so a value of 1 means "as often as a uniform draw over UV".
        let scale = bins as Float / options.samples as Float;
        let pixels: Vec<(Float, Float, Float)> = total.density
            .iter()
            .map(|c| {
                let v = *c as Float * scale;
                (v, v, v)
            })
            .collect();
        exr_utils::write_exr_to_file(&pixels, density_width, density_height, path)?;
    }
    Ok(())
}

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults_and_flags() {
        let options = parse_args(&args(&["envlight", "sky.exr"])).unwrap();
        assert_eq!(options.panorama, "sky.exr");
        assert_eq!(options.samples, 1 << 20);
        assert!(!options.nearest);
        assert!(options.density.is_none());

        let options = parse_args(&args(&[
            "envlight", "sky.hdr", "--samples", "1000", "--seed", "9",
            "--azimuth-offset", "0.5", "--nearest", "--density", "out.exr",
        ])).unwrap();
        assert_eq!(options.samples, 1000);
        assert_eq!(options.seed, 9);
        assert_eq!(options.azimuth_offset, 0.5);
        assert!(options.nearest);
        assert_eq!(options.density.as_deref(), Some("out.exr"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&args(&["envlight"])).is_err());
        assert!(parse_args(&args(&["envlight", "sky.exr", "--samples"])).is_err());
        assert!(parse_args(&args(&["envlight", "sky.exr", "--samples", "many"])).is_err());
        assert!(parse_args(&args(&["envlight", "sky.exr", "--samples", "0"])).is_err());
        assert!(parse_args(&args(&["envlight", "sky.exr", "--bogus"])).is_err());
    }
}
