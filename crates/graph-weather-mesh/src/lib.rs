//! Hexagonal mesh construction for graph weather models.
//!
//! This crate turns lat/lon location sets into the static graph structure
//! that the encoder, processor and decoder run on. It has no tensor
//! dependency: everything here is plain index and attribute buffers built
//! once per location set and resolution.
//!
//! # Architecture
//!
//! ```text
//! locations ──► BipartiteGraph::to_mesh ──► HexMesh (H3 cells + 1-ring edges)
//!                                                 │
//! locations ◄── BipartiteGraph::from_mesh ◄───────┘
//!
//! locations ──► GridLayout (unique lat × unique lon rectangle)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use graph_weather_mesh::{BipartiteGraph, HexMesh, LatLon};
//!
//! let mesh = HexMesh::new(2)?;
//! assert_eq!(mesh.num_cells(), 5882);
//!
//! let locations = vec![LatLon::new(51.5, 0.0), LatLon::new(40.7, 286.0)];
//! let graph = BipartiteGraph::to_mesh(&mesh, &locations)?;
//! assert_eq!(graph.edges().len(), 2);
//! # Ok::<(), graph_weather_mesh::MeshError>(())
//! ```

pub mod bipartite;
pub mod edges;
pub mod error;
pub mod grid;
pub mod location;
pub mod mesh;

pub use bipartite::{BipartiteGraph, Direction, OBSERVATION_ATTR_WIDTH};
pub use edges::EdgeList;
pub use error::{MeshError, MeshResult};
pub use grid::{grid_shape, GridLayout};
pub use location::{distance_features, LatLon, Observation};
pub use mesh::{cell_count, HexMesh, DISTANCE_ATTR_WIDTH, MAX_MESH_RESOLUTION};
