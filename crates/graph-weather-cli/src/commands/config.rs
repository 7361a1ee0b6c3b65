//! `config`: print the configuration the other commands would use.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use graph_weather_nn::GraphWeatherConfig;

use super::{fail, load_config};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    /// Print built-in defaults, ignoring file and environment
    #[arg(long)]
    pub defaults: bool,

    /// Output as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

pub fn handle_config(args: ConfigArgs, config_path: Option<&Path>) -> i32 {
    let config = if args.defaults {
        Ok(GraphWeatherConfig::default())
    } else {
        load_config(config_path)
    };
    match config.and_then(|c| render(&c, args.json)) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => fail(e),
    }
}

fn render(config: &GraphWeatherConfig, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(config).context("Failed to serialize configuration");
    }
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}
