//! Error types for mesh construction.

use thiserror::Error;

/// Mesh-specific errors.
#[derive(Debug, Error)]
pub enum MeshError {
    /// H3 resolution outside 0..=15.
    #[error("Invalid H3 resolution {resolution}: expected 0..=15")]
    InvalidResolution { resolution: u8 },

    /// Valid H3 resolution whose global mesh is too large to build.
    #[error("H3 resolution {resolution} has {cells} cells; meshes are limited to resolution {max}")]
    ResolutionTooFine { resolution: u8, cells: u64, max: u8 },

    /// Coordinate is not finite or latitude is outside [-90, 90].
    #[error("Invalid coordinate at index {index}: lat={lat}, lon={lon}")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },

    /// A graph was requested for zero locations.
    #[error("Location set is empty")]
    EmptyLocations,

    /// Locations do not fill the (unique lat) x (unique lon) rectangle.
    #[error("Grid does not factor: {locations} locations for a {rows}x{cols} grid")]
    GridDoesNotFactor {
        locations: usize,
        rows: usize,
        cols: usize,
    },

    /// Two locations occupy the same grid position.
    #[error("Duplicate grid position ({row}, {col}) at location {index}")]
    DuplicateGridPosition { index: usize, row: usize, col: usize },

    /// A cell produced by the indexer is missing from the mesh.
    #[error("Cell {cell} is not part of the resolution-{resolution} mesh")]
    CellNotInMesh { cell: String, resolution: u8 },
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
