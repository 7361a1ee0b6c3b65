//! Data assimilation: irregular observations to an analysis on a fixed grid.
//!
//! ```text
//! observations [B, N, obs_dim] + sites ──► AssimilatorEncoder
//!                                               │
//!                                           Processor
//!                                               │
//!                     AssimilatorDecoder ──► analysis [B, L_out, analysis_dim]
//! ```

mod decoder;
mod encoder;

pub use decoder::{AssimilatorDecoder, DecoderOptions};
pub use encoder::AssimilatorEncoder;

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use graph_weather_mesh::{HexMesh, LatLon, Observation};

use crate::config::AssimilatorConfig;
use crate::encoder::EncoderOptions;
use crate::error::{ModelError, ModelResult};
use crate::processor::Processor;

pub struct GraphWeatherAssimilator {
    config: AssimilatorConfig,
    varmap: VarMap,
    encoder: AssimilatorEncoder,
    processor: Processor,
    decoder: AssimilatorDecoder,
}

impl GraphWeatherAssimilator {
    pub fn new(
        output_locations: &[LatLon],
        config: AssimilatorConfig,
        device: &Device,
    ) -> ModelResult<Self> {
        Self::from_varmap(output_locations, config, VarMap::new(), device)
    }

    pub fn from_varmap(
        output_locations: &[LatLon],
        config: AssimilatorConfig,
        varmap: VarMap,
        device: &Device,
    ) -> ModelResult<Self> {
        config.validate()?;
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let mesh = Arc::new(HexMesh::new(config.resolution)?);
        let chunk_rows = config.checkpoint.chunk();

        let encoder = AssimilatorEncoder::new(
            mesh.clone(),
            EncoderOptions {
                input_dim: config.observation_dim,
                node_dim: config.node_dim,
                edge_dim: config.edge_dim,
                processor: &config.processor,
                norm_type: config.norm_type,
                chunk_rows,
            },
            vb.pp("encoder"),
        )?;
        let processor = Processor::new(
            config.node_dim,
            config.edge_dim,
            &config.processor,
            config.norm_type,
            vb.pp("processor"),
        )?;
        let decoder = AssimilatorDecoder::new(
            mesh.clone(),
            output_locations,
            DecoderOptions {
                node_dim: config.node_dim,
                edge_dim: config.edge_dim,
                output_dim: config.analysis_dim,
                processor: &config.processor,
                decoder: &config.decoder,
                norm_type: config.norm_type,
                chunk_rows,
            },
            vb.pp("decoder"),
        )?;

        let model = Self {
            config,
            varmap,
            encoder,
            processor,
            decoder,
        };
        tracing::info!(
            "GraphWeatherAssimilator loaded: {} params, {} output locations, {} cells",
            model.num_parameters(),
            output_locations.len(),
            mesh.num_cells()
        );
        Ok(model)
    }

    pub fn config(&self) -> &AssimilatorConfig {
        &self.config
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn num_parameters(&self) -> usize {
        self.varmap
            .all_vars()
            .iter()
            .map(|v| v.elem_count())
            .sum()
    }

    pub fn num_output_locations(&self) -> usize {
        self.decoder.graph().num_locations()
    }

    /// Analysis `[B, L_out, analysis_dim]` from observation features
    /// `[B, N, observation_dim]` taken at `observations`.
    pub fn forward(&self, features: &Tensor, observations: &[Observation]) -> ModelResult<Tensor> {
        let (_, count, _) = features.dims3()?;
        if count != observations.len() {
            return Err(ModelError::InvalidInput(format!(
                "{} observation feature rows but {} observation sites",
                count,
                observations.len()
            )));
        }
        let encoded = self.encoder.forward(features, observations)?;
        let x = self
            .processor
            .forward(&encoded.nodes, &encoded.edge_index, &encoded.edge_attr)?;
        self.decoder.forward(&x)
    }
}
