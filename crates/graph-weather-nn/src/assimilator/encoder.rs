//! Observation encoder.
//!
//! Same layers as the grid [`crate::Encoder`], but observation sites change
//! between calls, so the observation → cell graph is built per forward from
//! the `(lat, lon, height)` of each observation. Edge attributes are
//! `[sin d, cos d, height]`.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use graph_weather_mesh::{BipartiteGraph, HexMesh, Observation, OBSERVATION_ATTR_WIDTH};

use crate::encoder::{EncodedGraph, EncoderOptions, MeshEncoder};
use crate::error::ModelResult;

#[derive(Debug, Clone)]
pub struct AssimilatorEncoder {
    inner: MeshEncoder,
}

impl AssimilatorEncoder {
    pub fn new(mesh: Arc<HexMesh>, opts: EncoderOptions<'_>, vb: VarBuilder) -> ModelResult<Self> {
        Ok(Self {
            inner: MeshEncoder::new(mesh, OBSERVATION_ATTR_WIDTH, opts, vb)?,
        })
    }

    pub fn mesh(&self) -> &Arc<HexMesh> {
        self.inner.mesh()
    }

    /// Encode `[B, N, input_dim]` observation features taken at
    /// `observations` (length `N`).
    pub fn forward(&self, features: &Tensor, observations: &[Observation]) -> ModelResult<EncodedGraph> {
        let graph = BipartiteGraph::observations_to_mesh(self.inner.mesh(), observations)?;
        self.inner.forward(features, &graph)
    }
}
