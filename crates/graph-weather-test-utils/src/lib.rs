//! Location fixtures for graph weather tests.
//!
//! All generators are deterministic: random ones take an explicit seed and
//! use ChaCha8 so the same seed produces the same locations on every
//! platform. Locations are returned as plain tuples so this crate does not
//! depend on the crates it helps test.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Regular grid: latitudes `-90..90` and longitudes `0..360` with the given
/// steps in degrees, latitude-major.
///
/// `regular_lat_lons(5, 5)` is the 36 × 72 = 2592 point global grid.
pub fn regular_lat_lons(lat_step: usize, lon_step: usize) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    for lat in (-90..90).step_by(lat_step) {
        for lon in (0..360).step_by(lon_step) {
            out.push((lat as f64, lon as f64));
        }
    }
    out
}

/// Uneven grid: 7° latitude bands, 5° spacing over the western half and 9°
/// over the eastern half of each band.
pub fn uneven_lat_lons() -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    for lat in (-90..90).step_by(7) {
        for lon in (0..180).step_by(5) {
            out.push((lat as f64, lon as f64));
        }
        for lon in (180..360).step_by(9) {
            out.push((lat as f64, lon as f64));
        }
    }
    out
}

/// Regular grid with each coordinate shifted by a uniform `[0, 1)` degree
/// offset.
pub fn jittered_lat_lons(lat_step: usize, lon_step: usize, seed: u64) -> Vec<(f64, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    regular_lat_lons(lat_step, lon_step)
        .into_iter()
        .map(|(lat, lon)| (lat + rng.gen::<f64>(), lon + rng.gen::<f64>()))
        .collect()
}

/// Observation sites `(lat, lon, height)`: a 6° longitude raster over the
/// western hemisphere plus `random_per_band` random longitudes in each 7°
/// latitude band; heights uniform in `[0, 1)`.
pub fn random_observations(random_per_band: usize, seed: u64) -> Vec<(f64, f64, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = Vec::new();
    for lat in (-90..90).step_by(7) {
        for lon in (0..180).step_by(6) {
            out.push((lat as f64, lon as f64, rng.gen::<f64>()));
        }
        for _ in 0..random_per_band {
            let lon = rng.gen_range(0.0..360.0);
            out.push((lat as f64, lon, rng.gen::<f64>()));
        }
    }
    out
}

/// The four-corner grid used by conservation tests: lats and lons in
/// `{-90, 90}` × `{-90, 90}`, giving a 2 × 2 layout.
pub fn corner_lat_lons() -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    for lat in [-90.0, 90.0] {
        for lon in [-90.0, 90.0] {
            out.push((lat, lon));
        }
    }
    out
}

/// Deterministic pseudo-random values in `[-1, 1)`, for filling tensors.
pub fn uniform_values(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Deterministic standard-normal values, for filling tensors.
pub fn normal_values(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| StandardNormal.sample(&mut rng)).collect()
}
