//! Geographic location types.
//!
//! Latitudes and longitudes are in degrees. Longitudes are not wrapped:
//! `0..360` and `-180..180` conventions both index into the same cells.

use h3o::LatLng;
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLon {
    /// Create a new location.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Convert to an H3 coordinate, validating ranges.
    ///
    /// `index` is only used for error reporting.
    pub fn to_latlng(self, index: usize) -> MeshResult<LatLng> {
        if !self.lat.is_finite() || !self.lon.is_finite() || self.lat.abs() > 90.0 {
            return Err(MeshError::InvalidCoordinate {
                index,
                lat: self.lat,
                lon: self.lon,
            });
        }
        LatLng::new(self.lat, self.lon).map_err(|_| MeshError::InvalidCoordinate {
            index,
            lat: self.lat,
            lon: self.lon,
        })
    }

    /// Area weight of a cell at this latitude: `cos(lat)`.
    pub fn area_weight(self) -> f64 {
        self.lat.to_radians().cos()
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self::new(lat, lon)
    }
}

/// An observation site: a location plus a height.
///
/// Height is passed through to edge attributes unchanged, so callers choose
/// its unit (normalised heights work best).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Observation height.
    pub height: f64,
}

impl Observation {
    /// Create a new observation site.
    pub const fn new(lat: f64, lon: f64, height: f64) -> Self {
        Self { lat, lon, height }
    }

    /// Horizontal position of the observation.
    pub const fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

impl From<(f64, f64, f64)> for Observation {
    fn from((lat, lon, height): (f64, f64, f64)) -> Self {
        Self::new(lat, lon, height)
    }
}

/// Geometric edge features for a great-circle distance in radians.
#[inline]
pub fn distance_features(distance_rads: f64) -> [f32; 2] {
    [distance_rads.sin() as f32, distance_rads.cos() as f32]
}
