//! `assimilate`: run the assimilator on a random observation set.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use candle_core::Device;
use clap::Args;
use graph_weather_nn::GraphWeatherAssimilator;
use serde::Serialize;
use tracing::info;

use super::synthetic::{observation_sites, regular_grid, uniform_tensor};
use super::{fail, load_config, print_json, TensorStats};

/// Arguments for the assimilate command.
#[derive(Args)]
pub struct AssimilateArgs {
    /// Output grid spacing in degrees
    #[arg(short, long, default_value = "5")]
    pub grid_step: usize,

    /// Random observation sites per 7° latitude band, on top of a 6° raster
    #[arg(long, default_value = "100")]
    pub obs_per_band: usize,

    /// Batch size
    #[arg(short, long, default_value = "1")]
    pub batch: usize,

    /// Seed for observation sites and values
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct AssimilateReport {
    parameters: usize,
    observations: usize,
    output_locations: usize,
    output_shape: Vec<usize>,
    analysis: TensorStats,
    millis: u128,
}

pub fn handle_assimilate(args: AssimilateArgs, config_path: Option<&Path>) -> i32 {
    match run(&args, config_path) {
        Ok(report) => {
            if args.json {
                print_json(&report);
            } else {
                println!(
                    "Assimilator: {} parameters, {} observations -> {} locations",
                    report.parameters, report.observations, report.output_locations
                );
                println!(
                    "Analysis {:?}: mean {:.4}, std {:.4} ({} ms)",
                    report.output_shape, report.analysis.mean, report.analysis.std, report.millis
                );
            }
            0
        }
        Err(e) => fail(e),
    }
}

fn run(args: &AssimilateArgs, config_path: Option<&Path>) -> Result<AssimilateReport> {
    if args.batch == 0 {
        anyhow::bail!("--batch must be at least 1");
    }
    let config = load_config(config_path)?.assimilator;
    let device = Device::Cpu;
    let outputs = regular_grid(args.grid_step)?;
    let model = GraphWeatherAssimilator::new(&outputs, config.clone(), &device)
        .context("Failed to build assimilator")?;

    let sites = observation_sites(args.obs_per_band, args.seed);
    let features = uniform_tensor(
        (args.batch, sites.len(), config.observation_dim),
        args.seed.wrapping_add(1),
        &device,
    )?;

    let start = Instant::now();
    let analysis = model.forward(&features, &sites)?;
    let millis = start.elapsed().as_millis();
    let stats = TensorStats::of(&analysis)?;
    info!(
        "Assimilated {} observations in {} ms",
        sites.len(),
        millis
    );

    Ok(AssimilateReport {
        parameters: model.num_parameters(),
        observations: sites.len(),
        output_locations: outputs.len(),
        output_shape: analysis.dims().to_vec(),
        analysis: stats,
        millis,
    })
}
