//! Full forecast model: Encoder → Processor → Decoder → Constraint Layer.
//!
//! # Architecture
//!
//! ```text
//! features [B, L, F+A]
//!     │
//!     ├─► Encoder ──► [B·C, node_dim] + latent mesh edges
//!     │                   │
//!     │               Processor (num_blocks interaction blocks)
//!     │                   │
//!     └─► [.., :F] ──► Decoder (+ residual) ──► [B, L, out]
//!                         │
//!          grid order [B, out, H, W] ──► ConstraintLayer ──► location order
//!                                             ▲
//!                          features[.., :out] ┘
//! ```
//!
//! The hex mesh and bipartite graphs are built once in the constructor and
//! shared read-only by every forward call.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use graph_weather_mesh::{GridLayout, HexMesh, LatLon};

use crate::assimilator::DecoderOptions;
use crate::config::{ConstraintConfig, ForecasterConfig};
use crate::constraint::ConstraintLayer;
use crate::decoder::Decoder;
use crate::encoder::{Encoder, EncoderOptions};
use crate::error::{ModelError, ModelResult};
use crate::processor::Processor;

pub struct GraphWeatherForecaster {
    config: ForecasterConfig,
    varmap: VarMap,
    mesh: Arc<HexMesh>,
    encoder: Encoder,
    processor: Processor,
    decoder: Decoder,
    constraint: Option<GridConstraint>,
    num_locations: usize,
}

impl GraphWeatherForecaster {
    /// Build a forecaster with freshly initialised parameters.
    pub fn new(locations: &[LatLon], config: ForecasterConfig, device: &Device) -> ModelResult<Self> {
        Self::from_varmap(locations, config, VarMap::new(), device)
    }

    /// Build a forecaster on `varmap`. Variables already present under the
    /// same names are reused, so two models built on one map share weights.
    pub fn from_varmap(
        locations: &[LatLon],
        config: ForecasterConfig,
        varmap: VarMap,
        device: &Device,
    ) -> ModelResult<Self> {
        config.validate()?;

        let constraint = if config.constraint.enabled {
            Some(GridConstraint::new(locations, &config.constraint, device)?)
        } else {
            None
        };

        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let mesh = Arc::new(HexMesh::new(config.resolution)?);
        let chunk_rows = config.checkpoint.chunk();

        let encoder = Encoder::new(
            mesh.clone(),
            locations,
            EncoderOptions {
                input_dim: config.input_dim(),
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
        let decoder = Decoder::new(
            mesh.clone(),
            locations,
            DecoderOptions {
                node_dim: config.node_dim,
                edge_dim: config.edge_dim,
                output_dim: config.output_dim(),
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
            mesh,
            encoder,
            processor,
            decoder,
            constraint,
            num_locations: locations.len(),
        };
        tracing::info!(
            "GraphWeatherForecaster loaded: {} params, {} locations, {} cells, {} latent edges, {} blocks",
            model.num_parameters(),
            model.num_locations,
            model.mesh.num_cells(),
            model.mesh.edges().len(),
            model.processor.num_blocks()
        );
        Ok(model)
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// Parameter store, for optimizers and weight sharing.
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

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn mesh(&self) -> &HexMesh {
        &self.mesh
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// `(rows, cols)` of the location grid, when constraints are enabled.
    pub fn grid_shape(&self) -> Option<(usize, usize)> {
        self.constraint.as_ref().map(|c| c.layer.grid())
    }

    /// Next state `[B, L, output_dim]` from features `[B, L, feature_dim + aux_dim]`.
    pub fn forward(&self, features: &Tensor) -> ModelResult<Tensor> {
        let (_, locations, dim) = features.dims3()?;
        if locations != self.num_locations || dim != self.config.input_dim() {
            return Err(ModelError::shape(
                "forecaster input",
                ("B", self.num_locations, self.config.input_dim()),
                features.dims(),
            ));
        }

        let encoded = self.encoder.forward(features)?;
        let x = self
            .processor
            .forward(&encoded.nodes, &encoded.edge_index, &encoded.edge_attr)?;
        let physical = features.narrow(2, 0, self.config.feature_dim)?;
        let out = self.decoder.forward(&x, &physical)?;

        match &self.constraint {
            // Constrain against the same channels the residual adds.
            Some(constraint) => {
                let reference = physical.narrow(2, 0, self.config.output_dim())?;
                constraint.apply(&out, &reference)
            }
            None => Ok(out),
        }
    }
}

/// Constraint layer plus the gathers between location and grid order.
struct GridConstraint {
    layer: ConstraintLayer,
    /// `None` when locations are already row-major.
    gathers: Option<(Tensor, Tensor)>,
}

impl GridConstraint {
    fn new(locations: &[LatLon], config: &ConstraintConfig, device: &Device) -> ModelResult<Self> {
        let layout = GridLayout::infer(locations)?;
        let layer = ConstraintLayer::new(layout.shape(), config)?;
        let gathers = if layout.is_identity() {
            None
        } else {
            let to_grid = Tensor::from_slice(layout.grid_to_location(), layout.len(), device)?;
            let to_locations = Tensor::from_slice(layout.location_to_grid(), layout.len(), device)?;
            Some((to_grid, to_locations))
        };
        Ok(Self { layer, gathers })
    }

    /// `[B, L, C]` → `[B, C, H, W]`
    fn to_grid(&self, x: &Tensor) -> ModelResult<Tensor> {
        let (batch, _, channels) = x.dims3()?;
        let (rows, cols) = self.layer.grid();
        let x = match &self.gathers {
            Some((to_grid, _)) => x.contiguous()?.index_select(to_grid, 1)?,
            None => x.clone(),
        };
        Ok(x.permute((0, 2, 1))?
            .contiguous()?
            .reshape((batch, channels, rows, cols))?)
    }

    /// `[B, C, H, W]` → `[B, L, C]`
    fn to_locations(&self, x: &Tensor) -> ModelResult<Tensor> {
        let (batch, channels, rows, cols) = x.dims4()?;
        let x = x
            .reshape((batch, channels, rows * cols))?
            .permute((0, 2, 1))?
            .contiguous()?;
        Ok(match &self.gathers {
            Some((_, to_locations)) => x.index_select(to_locations, 1)?,
            None => x,
        })
    }

    fn apply(&self, prediction: &Tensor, reference: &Tensor) -> ModelResult<Tensor> {
        let corrected = self
            .layer
            .forward(&self.to_grid(prediction)?, &self.to_grid(reference)?)?;
        self.to_locations(&corrected)
    }
}
