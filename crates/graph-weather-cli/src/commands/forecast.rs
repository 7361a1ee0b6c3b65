//! `forecast`: build a forecaster from configuration and run it on
//! synthetic features, optionally rolling the prediction forward.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use clap::Args;
use graph_weather_nn::{GraphWeatherForecaster, NormalizedMseLoss};
use serde::Serialize;
use tracing::info;

use super::synthetic::{regular_grid, uniform_tensor};
use super::{fail, load_config, print_json, TensorStats};

/// Arguments for the forecast command.
#[derive(Args)]
pub struct ForecastArgs {
    /// Grid spacing in degrees for the location set
    #[arg(short, long, default_value = "5")]
    pub grid_step: usize,

    /// Batch size
    #[arg(short, long, default_value = "1")]
    pub batch: usize,

    /// Autoregressive steps (output fed back as the next physical state)
    #[arg(short, long, default_value = "1")]
    pub steps: usize,

    /// Seed for the synthetic features
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    output: TensorStats,
    /// Unnormalized latitude-weighted MSE against the input state.
    change_from_input: f32,
    millis: u128,
}

#[derive(Debug, Serialize)]
struct ForecastReport {
    parameters: usize,
    locations: usize,
    cells: usize,
    output_shape: Vec<usize>,
    steps: Vec<StepReport>,
}

pub fn handle_forecast(args: ForecastArgs, config_path: Option<&Path>) -> i32 {
    match run(&args, config_path) {
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

fn run(args: &ForecastArgs, config_path: Option<&Path>) -> Result<ForecastReport> {
    if args.batch == 0 || args.steps == 0 {
        anyhow::bail!("--batch and --steps must be at least 1");
    }
    let config = load_config(config_path)?.forecaster;
    if args.steps > 1 && config.output_dim() != config.feature_dim {
        anyhow::bail!(
            "rollout needs output_dim == feature_dim, got {} and {}",
            config.output_dim(),
            config.feature_dim
        );
    }

    let device = Device::Cpu;
    let locations = regular_grid(args.grid_step)?;
    let model = GraphWeatherForecaster::new(&locations, config.clone(), &device)
        .context("Failed to build forecaster")?;

    let input_dim = config.input_dim();
    let mut features = uniform_tensor(
        (args.batch, locations.len(), input_dim),
        args.seed,
        &device,
    )?;

    let variance = Tensor::ones(config.output_dim(), DType::F32, &device)?;
    let criterion = NormalizedMseLoss::new(variance, &locations, false)?;

    let mut steps = Vec::with_capacity(args.steps);
    let mut output_shape = Vec::new();
    for step in 0..args.steps {
        let start = Instant::now();
        let out = model
            .forward(&features)
            .with_context(|| format!("Forward pass failed at step {}", step))?;
        let millis = start.elapsed().as_millis();

        let previous = features.narrow(2, 0, config.output_dim())?;
        let change = criterion.forward(&out, &previous)?.to_scalar::<f32>()?;
        let stats = TensorStats::of(&out)?;
        info!(
            "Step {}: mean {:.4}, std {:.4}, change {:.4} ({} ms)",
            step, stats.mean, stats.std, change, millis
        );

        output_shape = out.dims().to_vec();
        steps.push(StepReport {
            step,
            output: stats,
            change_from_input: change,
            millis,
        });

        if step + 1 < args.steps {
            features = if config.aux_dim == 0 {
                out
            } else {
                let aux = features.narrow(2, config.feature_dim, config.aux_dim)?;
                Tensor::cat(&[&out, &aux], 2)?
            };
        }
    }

    Ok(ForecastReport {
        parameters: model.num_parameters(),
        locations: locations.len(),
        cells: model.mesh().num_cells(),
        output_shape,
        steps,
    })
}

fn print_report(report: &ForecastReport) {
    println!(
        "Forecaster: {} parameters, {} locations, {} cells",
        report.parameters, report.locations, report.cells
    );
    println!("Output shape: {:?}", report.output_shape);
    for step in &report.steps {
        println!(
            "  step {:>3}: mean {:>9.4}  std {:>9.4}  change {:>9.4}  {:>6} ms",
            step.step, step.output.mean, step.output.std, step.change_from_input, step.millis
        );
    }
}
