//! Integration tests for mesh and bipartite graph construction.
//!
//! Node and edge counts here are the same ones the models rely on, so a
//! change in any of them is a breaking change for saved weights.

use graph_weather_mesh::{
    cell_count, grid_shape, BipartiteGraph, GridLayout, HexMesh, LatLon, Observation,
};
use graph_weather_test_utils::{
    jittered_lat_lons, random_observations, regular_lat_lons, uneven_lat_lons,
};

fn to_lat_lons(raw: Vec<(f64, f64)>) -> Vec<LatLon> {
    raw.into_iter().map(LatLon::from).collect()
}

// ============================================================================
// MESH COUNTS
// ============================================================================

#[test]
fn test_resolution_two_mesh_counts() {
    let mesh = HexMesh::new(2).expect("resolution 2 mesh");
    assert_eq!(mesh.num_cells(), 5882);
    assert_eq!(mesh.edges().len(), 41162);
    assert_eq!(cell_count(2).unwrap(), 5882);
}

#[test]
fn test_edge_count_formula_per_resolution() {
    for res in 0..=2u8 {
        let mesh = HexMesh::new(res).unwrap();
        assert_eq!(
            mesh.edges().len(),
            7 * mesh.num_cells() - 12,
            "resolution {}",
            res
        );
    }
}

#[test]
fn test_mesh_is_deterministic() {
    let a = HexMesh::new(1).unwrap();
    let b = HexMesh::new(1).unwrap();
    assert_eq!(a.cells(), b.cells());
    assert_eq!(a.edges(), b.edges());
}

#[test]
fn test_every_cell_sends_to_itself_and_ring() {
    let mesh = HexMesh::new(1).unwrap();
    let out_degree = {
        let mut d = vec![0usize; mesh.num_cells()];
        for &s in mesh.edges().senders() {
            d[s as usize] += 1;
        }
        d
    };
    let pentagons = out_degree.iter().filter(|&&d| d == 6).count();
    let hexagons = out_degree.iter().filter(|&&d| d == 7).count();
    assert_eq!(pentagons, 12);
    assert_eq!(pentagons + hexagons, mesh.num_cells());
}

// ============================================================================
// BIPARTITE GRAPHS
// ============================================================================

#[test]
fn test_regular_grid_bipartite_graph() {
    let mesh = HexMesh::new(2).unwrap();
    let locations = to_lat_lons(regular_lat_lons(5, 5));
    let graph = BipartiteGraph::to_mesh(&mesh, &locations).unwrap();

    assert_eq!(graph.num_locations(), 2592);
    assert_eq!(graph.num_nodes(), 2592 + 5882);
    assert_eq!(graph.edges().len(), 2592);
    assert!((graph.edges().max_node().unwrap() as usize) < graph.num_nodes());
}

#[test]
fn test_uneven_grid_maps_every_location() {
    let mesh = HexMesh::new(2).unwrap();
    let locations = to_lat_lons(uneven_lat_lons());
    let graph = BipartiteGraph::to_mesh(&mesh, &locations).unwrap();

    assert_eq!(graph.assignment().len(), locations.len());
    assert!(graph
        .assignment()
        .iter()
        .all(|&c| (c as usize) < mesh.num_cells()));
}

#[test]
fn test_bipartite_graph_is_deterministic() {
    let mesh = HexMesh::new(1).unwrap();
    let locations = to_lat_lons(jittered_lat_lons(10, 10, 42));
    let a = BipartiteGraph::from_mesh(&mesh, &locations).unwrap();
    let b = BipartiteGraph::from_mesh(&mesh, &locations).unwrap();
    assert_eq!(a.edges(), b.edges());
    assert_eq!(a.assignment(), b.assignment());
}

#[test]
fn test_observation_graph() {
    let mesh = HexMesh::new(2).unwrap();
    let observations: Vec<Observation> = random_observations(100, 9)
        .into_iter()
        .map(Observation::from)
        .collect();
    let graph = BipartiteGraph::observations_to_mesh(&mesh, &observations).unwrap();

    assert_eq!(graph.edges().len(), observations.len());
    assert_eq!(graph.edges().width(), 3);
    for (e, obs) in observations.iter().enumerate() {
        assert_eq!(graph.edges().attribute_row(e)[2], obs.height as f32);
    }
}

// ============================================================================
// GRID LAYOUT
// ============================================================================

#[test]
fn test_grid_layout_regular_and_jittered() {
    let regular = to_lat_lons(regular_lat_lons(5, 5));
    let layout = GridLayout::infer(&regular).unwrap();
    assert_eq!(layout.shape(), (36, 72));

    let jittered = to_lat_lons(jittered_lat_lons(5, 5, 3));
    assert!(GridLayout::infer(&jittered).is_err());
    let (rows, cols) = grid_shape(&jittered);
    assert!(rows * cols > jittered.len());
}
