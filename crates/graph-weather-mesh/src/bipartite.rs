//! Bipartite graphs between physical locations and mesh cells.
//!
//! Each location is connected to exactly one cell: the cell containing it.
//! Cells with no locations keep their node but receive no edges, and cells
//! covering several locations aggregate all of them.
//!
//! Node spaces:
//! - [`Direction::ToMesh`]: `[locations.., cells..]`, edges location → cell.
//! - [`Direction::FromMesh`]: `[cells.., locations..]`, edges cell → location.

use crate::edges::EdgeList;
use crate::error::{MeshError, MeshResult};
use crate::location::{distance_features, LatLon, Observation};
use crate::mesh::{HexMesh, DISTANCE_ATTR_WIDTH};

/// Width of the `[sin d, cos d, height]` observation attribute.
pub const OBSERVATION_ATTR_WIDTH: usize = 3;

/// Which way messages flow across the bipartite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Locations send to cells (encoder side).
    ToMesh,
    /// Cells send to locations (decoder side).
    FromMesh,
}

/// Location ↔ cell graph built against a [`HexMesh`].
#[derive(Debug, Clone)]
pub struct BipartiteGraph {
    direction: Direction,
    num_locations: usize,
    num_cells: usize,
    assignment: Vec<u32>,
    edges: EdgeList,
}

impl BipartiteGraph {
    /// Encoder graph: every location sends to its containing cell.
    pub fn to_mesh(mesh: &HexMesh, locations: &[LatLon]) -> MeshResult<Self> {
        let rows = locate_all(mesh, locations.iter().copied())?;
        Ok(Self::assemble(
            Direction::ToMesh,
            mesh.num_cells(),
            DISTANCE_ATTR_WIDTH,
            rows.into_iter()
                .map(|(cell, d)| (cell, distance_features(d).to_vec()))
                .collect(),
        ))
    }

    /// Decoder graph: every cell sends to the locations it contains.
    pub fn from_mesh(mesh: &HexMesh, locations: &[LatLon]) -> MeshResult<Self> {
        let rows = locate_all(mesh, locations.iter().copied())?;
        Ok(Self::assemble(
            Direction::FromMesh,
            mesh.num_cells(),
            DISTANCE_ATTR_WIDTH,
            rows.into_iter()
                .map(|(cell, d)| (cell, distance_features(d).to_vec()))
                .collect(),
        ))
    }

    /// Encoder graph for observations; the height is appended to the
    /// distance attribute.
    pub fn observations_to_mesh(mesh: &HexMesh, observations: &[Observation]) -> MeshResult<Self> {
        let rows = locate_all(mesh, observations.iter().map(Observation::position))?;
        Ok(Self::assemble(
            Direction::ToMesh,
            mesh.num_cells(),
            OBSERVATION_ATTR_WIDTH,
            rows.into_iter()
                .zip(observations)
                .map(|((cell, d), obs)| {
                    let [s, c] = distance_features(d);
                    (cell, vec![s, c, obs.height as f32])
                })
                .collect(),
        ))
    }

    fn assemble(
        direction: Direction,
        num_cells: usize,
        width: usize,
        rows: Vec<(u32, Vec<f32>)>,
    ) -> Self {
        let num_locations = rows.len();
        let mut edges = EdgeList::with_capacity(width, num_locations);
        let mut assignment = Vec::with_capacity(num_locations);

        for (i, (cell, attrs)) in rows.into_iter().enumerate() {
            assignment.push(cell);
            match direction {
                Direction::ToMesh => {
                    edges.push(i as u32, (num_locations as u32) + cell, &attrs)
                }
                Direction::FromMesh => edges.push(cell, (num_cells as u32) + i as u32, &attrs),
            }
        }

        Self {
            direction,
            num_locations,
            num_cells,
            assignment,
            edges,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Total nodes in the combined node space.
    pub fn num_nodes(&self) -> usize {
        self.num_locations + self.num_cells
    }

    /// Containing cell (mesh node position) of each location.
    pub fn assignment(&self) -> &[u32] {
        &self.assignment
    }

    pub fn edges(&self) -> &EdgeList {
        &self.edges
    }

    /// Number of distinct cells that contain at least one location.
    pub fn occupied_cells(&self) -> usize {
        let mut seen = vec![false; self.num_cells];
        for &cell in &self.assignment {
            seen[cell as usize] = true;
        }
        seen.into_iter().filter(|&s| s).count()
    }
}

fn locate_all(
    mesh: &HexMesh,
    locations: impl Iterator<Item = LatLon>,
) -> MeshResult<Vec<(u32, f64)>> {
    let rows = locations
        .enumerate()
        .map(|(i, loc)| mesh.locate(loc, i))
        .collect::<MeshResult<Vec<_>>>()?;
    if rows.is_empty() {
        return Err(MeshError::EmptyLocations);
    }
    Ok(rows)
}
