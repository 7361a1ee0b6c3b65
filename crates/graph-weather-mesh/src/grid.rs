//! Rectangular grid layout inferred from a location set.
//!
//! The grid has one row per unique latitude and one column per unique
//! longitude, both sorted ascending. A layout exists only when every
//! (row, col) position is filled by exactly one location.

use std::cmp::Ordering;

use crate::error::{MeshError, MeshResult};
use crate::location::LatLon;

/// Count unique latitudes and longitudes: `(rows, cols)`.
///
/// This never fails; use [`GridLayout::infer`] to check that the locations
/// actually fill the rectangle.
pub fn grid_shape(locations: &[LatLon]) -> (usize, usize) {
    let lats = sorted_unique(locations.iter().map(|l| l.lat));
    let lons = sorted_unique(locations.iter().map(|l| l.lon));
    (lats.len(), lons.len())
}

/// Bijection between location order and row-major grid order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    rows: usize,
    cols: usize,
    /// `grid_to_location[row * cols + col]` = location index.
    grid_to_location: Vec<u32>,
    /// `location_to_grid[location]` = row-major grid position.
    location_to_grid: Vec<u32>,
}

impl GridLayout {
    /// Infer the layout of `locations`.
    ///
    /// # Errors
    /// - `EmptyLocations` when the slice is empty
    /// - `GridDoesNotFactor` when `len != rows * cols`
    /// - `DuplicateGridPosition` when two locations share a position
    pub fn infer(locations: &[LatLon]) -> MeshResult<Self> {
        if locations.is_empty() {
            return Err(MeshError::EmptyLocations);
        }
        let lats = sorted_unique(locations.iter().map(|l| l.lat));
        let lons = sorted_unique(locations.iter().map(|l| l.lon));
        let (rows, cols) = (lats.len(), lons.len());

        if rows * cols != locations.len() {
            return Err(MeshError::GridDoesNotFactor {
                locations: locations.len(),
                rows,
                cols,
            });
        }

        let mut grid_to_location = vec![u32::MAX; rows * cols];
        let mut location_to_grid = Vec::with_capacity(locations.len());
        for (index, loc) in locations.iter().enumerate() {
            let row = position_of(&lats, loc.lat);
            let col = position_of(&lons, loc.lon);
            let slot = row * cols + col;
            if grid_to_location[slot] != u32::MAX {
                return Err(MeshError::DuplicateGridPosition { index, row, col });
            }
            grid_to_location[slot] = index as u32;
            location_to_grid.push(slot as u32);
        }

        Ok(Self {
            rows,
            cols,
            grid_to_location,
            location_to_grid,
        })
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather indices that reorder location-ordered data into grid order.
    pub fn grid_to_location(&self) -> &[u32] {
        &self.grid_to_location
    }

    /// Gather indices that reorder grid-ordered data back to location order.
    pub fn location_to_grid(&self) -> &[u32] {
        &self.location_to_grid
    }

    /// True when locations are already in row-major grid order.
    pub fn is_identity(&self) -> bool {
        self.location_to_grid
            .iter()
            .enumerate()
            .all(|(i, &g)| g as usize == i)
    }
}

/// Map `-0.0` to `0.0` so both land on the same row or column.
fn canonical(value: f64) -> f64 {
    value + 0.0
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.map(canonical).collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    v
}

fn position_of(sorted: &[f64], value: f64) -> usize {
    let value = canonical(value);
    sorted
        .binary_search_by(|v| v.total_cmp(&value))
        .unwrap_or_else(|insert| insert)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(step: i32) -> Vec<LatLon> {
        let mut out = Vec::new();
        for lat in (-90..90).step_by(step as usize) {
            for lon in (0..360).step_by(step as usize) {
                out.push(LatLon::new(lat as f64, lon as f64));
            }
        }
        out
    }

    #[test]
    fn test_regular_five_degree_grid() {
        let locations = regular(5);
        assert_eq!(grid_shape(&locations), (36, 72));
        let layout = GridLayout::infer(&locations).unwrap();
        assert_eq!(layout.shape(), (36, 72));
        assert_eq!(layout.len(), 2592);
        assert!(layout.is_identity());
    }

    #[test]
    fn test_column_major_input_is_reordered() {
        let mut locations = Vec::new();
        for lon in [0.0, 90.0, 180.0] {
            for lat in [-45.0, 45.0] {
                locations.push(LatLon::new(lat, lon));
            }
        }
        let layout = GridLayout::infer(&locations).unwrap();
        assert_eq!(layout.shape(), (2, 3));
        assert!(!layout.is_identity());
        // Grid position (0, 1) is lat -45, lon 90 → location 2.
        assert_eq!(layout.grid_to_location()[1], 2);
        for (loc, &slot) in layout.location_to_grid().iter().enumerate() {
            assert_eq!(layout.grid_to_location()[slot as usize] as usize, loc);
        }
    }

    #[test]
    fn test_jittered_grid_does_not_factor() {
        let locations: Vec<LatLon> = regular(30)
            .into_iter()
            .enumerate()
            .map(|(i, l)| LatLon::new(l.lat + 0.001 * i as f64, l.lon))
            .collect();
        let err = GridLayout::infer(&locations).unwrap_err();
        assert!(matches!(err, MeshError::GridDoesNotFactor { .. }));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let locations = vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 0.0),
            LatLon::new(1.0, 1.0),
            LatLon::new(1.0, 0.0),
        ];
        let err = GridLayout::infer(&locations).unwrap_err();
        assert!(matches!(err, MeshError::DuplicateGridPosition { index: 1, .. }));
    }

    #[test]
    fn test_signed_zero_shares_a_row() {
        let locations = vec![
            LatLon::new(-0.0, 10.0),
            LatLon::new(0.0, 20.0),
            LatLon::new(5.0, 10.0),
            LatLon::new(5.0, 20.0),
        ];
        assert_eq!(grid_shape(&locations), (2, 2));
        let layout = GridLayout::infer(&locations).unwrap();
        assert_eq!(layout.shape(), (2, 2));
        assert!(layout.is_identity());

        // Both points collapse onto the single (0, 0) position.
        let same_point = vec![LatLon::new(0.0, -0.0), LatLon::new(-0.0, 0.0)];
        assert_eq!(grid_shape(&same_point), (1, 1));
        assert!(matches!(
            GridLayout::infer(&same_point).unwrap_err(),
            MeshError::GridDoesNotFactor { rows: 1, cols: 1, .. }
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            GridLayout::infer(&[]).unwrap_err(),
            MeshError::EmptyLocations
        ));
    }
}
