//! graph-weather: inspect hex meshes and run synthetic model passes.
//!
//! ## Usage
//!
//! ```bash
//! # Mesh and bipartite graph sizes for a 5° grid at resolution 2
//! graph-weather mesh --resolution 2 --grid-step 5
//!
//! # Forecaster forward pass from a config file, 3-step rollout
//! graph-weather --config graph_weather.toml forecast --steps 3
//!
//! # Assimilate random observations onto the 5° grid
//! graph-weather assimilate --obs-per-band 100 --json
//!
//! # Effective configuration after file and GRAPH_WEATHER__* overrides
//! graph-weather --config graph_weather.toml config
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::assimilate::AssimilateArgs;
use commands::config::ConfigArgs;
use commands::forecast::ForecastArgs;
use commands::mesh::MeshArgs;

#[derive(Parser)]
#[command(name = "graph-weather", version, about = "Graph neural network weather model tools")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "GRAPH_WEATHER_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an H3 mesh and report node and edge counts
    Mesh(MeshArgs),
    /// Run the forecaster on synthetic features
    Forecast(ForecastArgs),
    /// Run the assimilator on synthetic observations
    Assimilate(AssimilateArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    let code = match cli.command {
        Commands::Mesh(args) => commands::mesh::handle_mesh(args),
        Commands::Forecast(args) => commands::forecast::handle_forecast(args, config_path),
        Commands::Assimilate(args) => commands::assimilate::handle_assimilate(args, config_path),
        Commands::Config(args) => commands::config::handle_config(args, config_path),
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast_with_global_flags() {
        let cli = Cli::try_parse_from([
            "graph-weather",
            "forecast",
            "--steps",
            "2",
            "--config",
            "model.toml",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("model.toml")));
        match cli.command {
            Commands::Forecast(args) => assert_eq!(args.steps, 2),
            _ => panic!("expected forecast"),
        }
    }

    #[test]
    fn test_parse_mesh_defaults() {
        let cli = Cli::try_parse_from(["graph-weather", "mesh"]).unwrap();
        match cli.command {
            Commands::Mesh(args) => {
                assert_eq!(args.resolution, 2);
                assert_eq!(args.grid_step, 5);
                assert!(!args.json);
            }
            _ => panic!("expected mesh"),
        }
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["graph-weather", "train"]).is_err());
    }
}
