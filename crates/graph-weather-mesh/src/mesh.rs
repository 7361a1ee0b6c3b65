//! Global H3 hexagonal mesh.
//!
//! The mesh contains every H3 cell at one resolution (122 at resolution 0,
//! 5882 at resolution 2). Nodes are ordered by ascending cell index so the
//! node numbering is identical across constructions. Each cell is connected
//! to its 1-ring including itself, which yields `7 * cells - 12` edges (the
//! twelve pentagons have five neighbours instead of six).

use std::collections::HashMap;

use h3o::{CellIndex, LatLng, Resolution};

use crate::edges::EdgeList;
use crate::error::{MeshError, MeshResult};
use crate::location::{distance_features, LatLon};

/// Width of the `[sin d, cos d]` distance attribute.
pub const DISTANCE_ATTR_WIDTH: usize = 2;

/// Finest resolution a global mesh is built for (2,016,842 cells).
pub const MAX_MESH_RESOLUTION: u8 = 5;

/// Immutable hexagonal mesh over the whole sphere.
#[derive(Debug, Clone)]
pub struct HexMesh {
    resolution: Resolution,
    cells: Vec<CellIndex>,
    centers: Vec<LatLng>,
    positions: HashMap<CellIndex, u32>,
    edges: EdgeList,
}

impl HexMesh {
    /// Build the mesh for an H3 resolution (0..=[`MAX_MESH_RESOLUTION`]).
    ///
    /// Practical resolutions for global models are 0..=3; the cell count
    /// grows by a factor of seven per level.
    pub fn new(resolution: u8) -> MeshResult<Self> {
        let res = Resolution::try_from(resolution)
            .map_err(|_| MeshError::InvalidResolution { resolution })?;
        if resolution > MAX_MESH_RESOLUTION {
            return Err(MeshError::ResolutionTooFine {
                resolution,
                cells: res.cell_count(),
                max: MAX_MESH_RESOLUTION,
            });
        }

        let mut cells: Vec<CellIndex> = CellIndex::base_cells()
            .flat_map(|base| base.children(res))
            .collect();
        cells.sort_unstable();

        let positions: HashMap<CellIndex, u32> = cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| (cell, i as u32))
            .collect();
        let centers: Vec<LatLng> = cells.iter().map(|&cell| LatLng::from(cell)).collect();

        let mut edges = EdgeList::with_capacity(DISTANCE_ATTR_WIDTH, cells.len() * 7);
        for (i, &cell) in cells.iter().enumerate() {
            let mut ring: Vec<CellIndex> = cell.grid_disk(1);
            ring.sort_unstable();
            for neighbour in ring {
                let j = *positions
                    .get(&neighbour)
                    .ok_or_else(|| MeshError::CellNotInMesh {
                        cell: neighbour.to_string(),
                        resolution,
                    })?;
                let distance = centers[i].distance_rads(centers[j as usize]);
                edges.push(i as u32, j, &distance_features(distance));
            }
        }

        tracing::debug!(
            "Built H3 mesh: resolution={}, cells={}, edges={}",
            resolution,
            cells.len(),
            edges.len()
        );

        Ok(Self {
            resolution: res,
            cells,
            centers,
            positions,
            edges,
        })
    }

    /// H3 resolution as a number.
    pub fn resolution(&self) -> u8 {
        u8::from(self.resolution)
    }

    /// Number of hexagonal (and pentagonal) cells.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Cells in node order.
    pub fn cells(&self) -> &[CellIndex] {
        &self.cells
    }

    /// Cell-to-cell edges of the latent mesh (sender = ring centre).
    pub fn edges(&self) -> &EdgeList {
        &self.edges
    }

    /// Node position of a cell, if it belongs to this mesh.
    pub fn position(&self, cell: CellIndex) -> Option<u32> {
        self.positions.get(&cell).copied()
    }

    /// Centre of the cell at node position `node`.
    pub fn center(&self, node: u32) -> Option<LatLon> {
        self.centers
            .get(node as usize)
            .map(|ll| LatLon::new(ll.lat(), ll.lng()))
    }

    /// Find the cell containing `location` and its great-circle distance
    /// (radians) to that cell's centre.
    ///
    /// `index` identifies the location in error messages.
    pub fn locate(&self, location: LatLon, index: usize) -> MeshResult<(u32, f64)> {
        let ll = location.to_latlng(index)?;
        let cell = ll.to_cell(self.resolution);
        let node = self
            .position(cell)
            .ok_or_else(|| MeshError::CellNotInMesh {
                cell: cell.to_string(),
                resolution: self.resolution(),
            })?;
        Ok((node, ll.distance_rads(self.centers[node as usize])))
    }
}

/// Number of cells an H3 resolution has across the globe.
pub fn cell_count(resolution: u8) -> MeshResult<u64> {
    Resolution::try_from(resolution)
        .map(Resolution::cell_count)
        .map_err(|_| MeshError::InvalidResolution { resolution })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_zero_counts() {
        let mesh = HexMesh::new(0).unwrap();
        assert_eq!(mesh.num_cells(), 122);
        assert_eq!(mesh.edges().len(), 7 * 122 - 12);
        assert_eq!(mesh.resolution(), 0);
    }

    #[test]
    fn test_invalid_resolution() {
        let err = HexMesh::new(16).unwrap_err();
        assert!(matches!(err, MeshError::InvalidResolution { resolution: 16 }));
    }

    #[test]
    fn test_fine_resolution_rejected_before_building() {
        for resolution in [MAX_MESH_RESOLUTION + 1, 15] {
            let err = HexMesh::new(resolution).unwrap_err();
            assert!(matches!(
                err,
                MeshError::ResolutionTooFine { max: MAX_MESH_RESOLUTION, .. }
            ));
        }
        assert!(matches!(
            HexMesh::new(15),
            Err(MeshError::ResolutionTooFine { cells: 569_707_381_193_162, .. })
        ));
    }

    #[test]
    fn test_cell_count_matches_mesh() {
        let mesh = HexMesh::new(1).unwrap();
        assert_eq!(cell_count(1).unwrap(), mesh.num_cells() as u64);
    }

    #[test]
    fn test_self_edges_have_zero_distance() {
        let mesh = HexMesh::new(0).unwrap();
        let edges = mesh.edges();
        let mut self_edges = 0;
        for e in 0..edges.len() {
            if edges.senders()[e] == edges.receivers()[e] {
                self_edges += 1;
                let row = edges.attribute_row(e);
                assert!(row[0].abs() < 1e-6);
                assert!((row[1] - 1.0).abs() < 1e-6);
            }
        }
        assert_eq!(self_edges, mesh.num_cells());
    }

    #[test]
    fn test_locate_returns_containing_cell() {
        let mesh = HexMesh::new(1).unwrap();
        let (node, distance) = mesh.locate(LatLon::new(10.0, 20.0), 0).unwrap();
        assert!((node as usize) < mesh.num_cells());
        // A resolution-1 cell is roughly 4 degrees across.
        assert!(distance < 0.1, "distance {} too large", distance);
    }

    #[test]
    fn test_locate_wraps_longitude() {
        let mesh = HexMesh::new(1).unwrap();
        let (a, _) = mesh.locate(LatLon::new(-30.0, 300.0), 0).unwrap();
        let (b, _) = mesh.locate(LatLon::new(-30.0, -60.0), 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_center_in_range() {
        let mesh = HexMesh::new(0).unwrap();
        let c = mesh.center(0).unwrap();
        assert!(c.lat.abs() <= 90.0);
        assert!(mesh.center(mesh.num_cells() as u32).is_none());
    }
}
