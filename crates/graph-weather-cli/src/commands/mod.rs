//! CLI command handlers
//!
//! # Modules
//!
//! - `mesh`: H3 mesh and bipartite graph statistics
//! - `forecast`: synthetic forecaster forward passes and rollouts
//! - `assimilate`: synthetic assimilator forward passes
//! - `config`: effective configuration dump
//! - `synthetic`: seeded grids, observation sites and feature tensors
//!
//! Handlers return a process exit code: 0 on success, 1 on error.

pub mod assimilate;
pub mod config;
pub mod forecast;
pub mod mesh;
pub mod synthetic;

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::Tensor;
use graph_weather_nn::GraphWeatherConfig;
use serde::Serialize;

/// Load configuration from defaults, the optional file and environment.
pub fn load_config(path: Option<&Path>) -> Result<GraphWeatherConfig> {
    GraphWeatherConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load default configuration".to_string(),
    })
}

/// Mean and standard deviation of all elements.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TensorStats {
    pub mean: f32,
    pub std: f32,
}

impl TensorStats {
    pub fn of(t: &Tensor) -> Result<Self> {
        let mean = t.mean_all()?;
        let std = t
            .broadcast_sub(&mean)?
            .sqr()?
            .mean_all()?
            .sqrt()?
            .to_scalar::<f32>()?;
        Ok(Self {
            mean: mean.to_scalar::<f32>()?,
            std,
        })
    }
}

/// Print `report` as pretty JSON.
pub fn print_json<T: Serialize>(report: &T) {
    println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
}

/// Log and print an error, returning the error exit code.
pub fn fail(err: anyhow::Error) -> i32 {
    tracing::error!("{:#}", err);
    eprintln!("Error: {:#}", err);
    1
}
