//! Multi-layer perceptron used by every learned update in the model.
//!
//! ```text
//! Linear(in, hidden) → SiLU → [Linear(hidden, hidden) → SiLU] × hidden_layers
//!     → Linear(hidden, out) → Norm
//! ```
//!
//! With a chunk size set, rows are pushed through the layers in slices of at
//! most `chunk_rows` and concatenated. Every layer is row-local, so chunking
//! bounds the size of intermediate activations without changing results.

use candle_core::Tensor;
use candle_nn::{Linear, Module, VarBuilder};

use crate::config::NormType;
use crate::error::{ModelError, ModelResult};
use crate::norm::Norm;

#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<Linear>,
    norm: Norm,
    in_dim: usize,
    out_dim: usize,
    chunk_rows: Option<usize>,
}

impl Mlp {
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        hidden_dim: usize,
        hidden_layers: usize,
        norm_type: NormType,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        let mut layers = Vec::with_capacity(hidden_layers + 2);
        layers.push(candle_nn::linear(in_dim, hidden_dim, vb.pp("layers.0"))?);
        for i in 0..hidden_layers {
            layers.push(candle_nn::linear(
                hidden_dim,
                hidden_dim,
                vb.pp(format!("layers.{}", i + 1)),
            )?);
        }
        layers.push(candle_nn::linear(
            hidden_dim,
            out_dim,
            vb.pp(format!("layers.{}", hidden_layers + 1)),
        )?);
        let norm = Norm::new(norm_type, out_dim, vb.pp("norm"))?;

        Ok(Self {
            layers,
            norm,
            in_dim,
            out_dim,
            chunk_rows: None,
        })
    }

    /// Evaluate at most `chunk_rows` rows at a time (`None` disables).
    pub fn with_chunking(mut self, chunk_rows: Option<usize>) -> Self {
        self.chunk_rows = chunk_rows.filter(|&c| c > 0);
        self
    }

    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Forward over a `[rows, in_dim]` tensor.
    pub fn forward(&self, x: &Tensor) -> ModelResult<Tensor> {
        let (rows, cols) = x.dims2()?;
        if cols != self.in_dim {
            return Err(ModelError::shape("mlp input", self.in_dim, cols));
        }
        match self.chunk_rows {
            Some(chunk) if rows > chunk => {
                let mut parts = Vec::with_capacity(rows.div_ceil(chunk));
                let mut start = 0;
                while start < rows {
                    let len = chunk.min(rows - start);
                    parts.push(self.forward_rows(&x.narrow(0, start, len)?)?);
                    start += len;
                }
                Ok(Tensor::cat(&parts, 0)?)
            }
            _ => self.forward_rows(x),
        }
    }

    fn forward_rows(&self, x: &Tensor) -> ModelResult<Tensor> {
        let last = self.layers.len() - 1;
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            if i < last {
                h = h.silu()?;
            }
        }
        self.norm.forward(&h)
    }
}
