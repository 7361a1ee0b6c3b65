//! `mesh`: build the latent H3 mesh and the grid ↔ mesh graphs and report
//! their sizes.

use anyhow::{Context, Result};
use clap::Args;
use graph_weather_mesh::{grid_shape, BipartiteGraph, HexMesh};
use serde::Serialize;
use tracing::info;

use super::synthetic::regular_grid;
use super::{fail, print_json};

/// Arguments for the mesh command.
#[derive(Args)]
pub struct MeshArgs {
    /// H3 resolution (0-5)
    #[arg(short, long, default_value = "2")]
    pub resolution: u8,

    /// Grid spacing in degrees for the location set
    #[arg(short, long, default_value = "5")]
    pub grid_step: usize,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct MeshReport {
    resolution: u8,
    cells: usize,
    latent_edges: usize,
    locations: usize,
    grid_rows: usize,
    grid_cols: usize,
    occupied_cells: usize,
    max_locations_per_cell: u32,
}

pub fn handle_mesh(args: MeshArgs) -> i32 {
    match build_report(&args) {
        Ok(report) => {
            if args.json {
                print_json(&report);
            } else {
                print_report(&report);
            }
            0
        }
        Err(e) => fail(e),
    }
}

fn build_report(args: &MeshArgs) -> Result<MeshReport> {
    let mesh = HexMesh::new(args.resolution)
        .with_context(|| format!("Failed to build mesh at resolution {}", args.resolution))?;
    let locations = regular_grid(args.grid_step)?;
    let graph = BipartiteGraph::to_mesh(&mesh, &locations)?;
    let (grid_rows, grid_cols) = grid_shape(&locations);

    let max_locations_per_cell = graph
        .edges()
        .in_degree(graph.num_nodes())
        .into_iter()
        .max()
        .unwrap_or(0);

    info!(
        "Mesh built: {} cells, {} latent edges, {} locations",
        mesh.num_cells(),
        mesh.edges().len(),
        locations.len()
    );

    Ok(MeshReport {
        resolution: args.resolution,
        cells: mesh.num_cells(),
        latent_edges: mesh.edges().len(),
        locations: locations.len(),
        grid_rows,
        grid_cols,
        occupied_cells: graph.occupied_cells(),
        max_locations_per_cell,
    })
}

fn print_report(report: &MeshReport) {
    println!("H3 resolution {}", report.resolution);
    println!("  cells:          {}", report.cells);
    println!("  latent edges:   {}", report.latent_edges);
    println!(
        "  locations:      {} ({} x {} grid)",
        report.locations, report.grid_rows, report.grid_cols
    );
    println!("  occupied cells: {}", report.occupied_cells);
    println!("  max per cell:   {}", report.max_locations_per_cell);
}
