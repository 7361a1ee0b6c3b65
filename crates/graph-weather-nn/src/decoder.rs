//! Forecast decoder: mesh decoding plus a residual on the input state.
//!
//! The network predicts a change; the first `output_dim` channels of the
//! reference features are added back so an untrained model starts from
//! persistence.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use graph_weather_mesh::{BipartiteGraph, HexMesh, LatLon};

use crate::assimilator::{AssimilatorDecoder, DecoderOptions};
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone)]
pub struct Decoder {
    inner: AssimilatorDecoder,
}

impl Decoder {
    pub fn new(
        mesh: Arc<HexMesh>,
        locations: &[LatLon],
        opts: DecoderOptions<'_>,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        Ok(Self {
            inner: AssimilatorDecoder::new(mesh, locations, opts, vb)?,
        })
    }

    pub fn graph(&self) -> &BipartiteGraph {
        self.inner.graph()
    }

    /// Decode `[B·C, node_dim]` and add `reference[..., :output_dim]`.
    ///
    /// `reference` is `[B, L, F]` with `F >= output_dim`.
    pub fn forward(&self, x: &Tensor, reference: &Tensor) -> ModelResult<Tensor> {
        let out = self.inner.forward(x)?;
        let (batch, locations, out_dim) = out.dims3()?;
        let (ref_batch, ref_locations, ref_dim) = reference.dims3()?;
        if ref_batch != batch || ref_locations != locations || ref_dim < out_dim {
            return Err(ModelError::shape(
                "decoder reference",
                (batch, locations, format!(">= {}", out_dim)),
                reference.dims(),
            ));
        }
        Ok((out + reference.narrow(2, 0, out_dim)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecoderConfig, NormType, ProcessorConfig};
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_residual_adds_leading_channels() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mesh = Arc::new(HexMesh::new(0).unwrap());
        let locations = vec![LatLon::new(10.0, 10.0), LatLon::new(-10.0, 100.0)];
        let processor = ProcessorConfig {
            hidden_dim_node: 8,
            hidden_dim_edge: 8,
            ..Default::default()
        };
        let decoder_config = DecoderConfig::default();
        let opts = DecoderOptions {
            node_dim: 4,
            edge_dim: 4,
            output_dim: 2,
            processor: &processor,
            decoder: &decoder_config,
            norm_type: NormType::LayerNorm,
            chunk_rows: None,
        };
        let decoder = Decoder::new(mesh.clone(), &locations, opts, vb).unwrap();

        let x = Tensor::zeros((mesh.num_cells(), 4), DType::F32, &Device::Cpu).unwrap();
        let zeros = Tensor::zeros((1, 2, 3), DType::F32, &Device::Cpu).unwrap();
        let shifted = (zeros.clone() + 5.0).unwrap();

        let base = decoder.forward(&x, &zeros).unwrap();
        let moved = decoder.forward(&x, &shifted).unwrap();
        assert_eq!(moved.dims(), &[1, 2, 2]);

        let diff: Vec<f32> = (moved - base).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        assert!(diff.iter().all(|d| (d - 5.0).abs() < 1e-5));
    }
}
