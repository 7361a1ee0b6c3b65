//! Seeded synthetic inputs for the model commands.

use anyhow::Result;
use candle_core::{Device, Shape, Tensor};
use graph_weather_mesh::{LatLon, Observation};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Regular global grid with `step` degree spacing, latitude-major.
pub fn regular_grid(step: usize) -> Result<Vec<LatLon>> {
    if step == 0 || step > 90 {
        anyhow::bail!("grid step must be between 1 and 90 degrees, got {}", step);
    }
    let mut out = Vec::new();
    for lat in (-90..90).step_by(step) {
        for lon in (0..360).step_by(step) {
            out.push(LatLon::new(lat as f64, lon as f64));
        }
    }
    Ok(out)
}

/// Observation sites: a 6° raster over the western hemisphere plus
/// `random_per_band` random longitudes in every 7° latitude band.
/// Heights are uniform in `[0, 1)`.
pub fn observation_sites(random_per_band: usize, seed: u64) -> Vec<Observation> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = Vec::new();
    for lat in (-90..90).step_by(7) {
        let lat = lat as f64;
        for lon in (0..180).step_by(6) {
            out.push(Observation::new(lat, lon as f64, rng.gen()));
        }
        for _ in 0..random_per_band {
            let lon = rng.gen_range(0.0..360.0);
            out.push(Observation::new(lat, lon, rng.gen()));
        }
    }
    out
}

/// Tensor of the given shape filled uniformly from `[-1, 1)`.
pub fn uniform_tensor<S: Into<Shape>>(shape: S, seed: u64, device: &Device) -> Result<Tensor> {
    let shape = shape.into();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let values: Vec<f32> = (0..shape.elem_count())
        .map(|_| rng.gen_range(-1.0f32..1.0))
        .collect();
    Ok(Tensor::from_vec(values, shape, device)?)
}
