//! Row-wise normalization layers.
//!
//! Written with plain tensor ops so every path is differentiable and each
//! row is normalized independently of the others.

use candle_core::{Tensor, D};
use candle_nn::{Init, VarBuilder};

use crate::config::NormType;
use crate::error::ModelResult;

const NORM_EPS: f64 = 1e-5;

/// A normalization layer over the last axis.
#[derive(Debug, Clone)]
pub enum Norm {
    /// (x - mean) / sqrt(var + eps) * weight + bias
    Layer { weight: Tensor, bias: Tensor },
    /// x / sqrt(mean(x²) + eps) * weight
    Rms { weight: Tensor },
    Identity,
}

impl Norm {
    pub fn new(kind: NormType, dim: usize, vb: VarBuilder) -> ModelResult<Self> {
        Ok(match kind {
            NormType::LayerNorm => Norm::Layer {
                weight: vb.get_with_hints(dim, "weight", Init::Const(1.0))?,
                bias: vb.get_with_hints(dim, "bias", Init::Const(0.0))?,
            },
            NormType::RmsNorm => Norm::Rms {
                weight: vb.get_with_hints(dim, "weight", Init::Const(1.0))?,
            },
            NormType::None => Norm::Identity,
        })
    }

    pub fn forward(&self, x: &Tensor) -> ModelResult<Tensor> {
        match self {
            Norm::Layer { weight, bias } => {
                let mean = x.mean_keepdim(D::Minus1)?;
                let centered = x.broadcast_sub(&mean)?;
                let var = centered.sqr()?.mean_keepdim(D::Minus1)?;
                let std = (var + NORM_EPS)?.sqrt()?;
                Ok(centered
                    .broadcast_div(&std)?
                    .broadcast_mul(weight)?
                    .broadcast_add(bias)?)
            }
            Norm::Rms { weight } => {
                let ms = x.sqr()?.mean_keepdim(D::Minus1)?;
                let rms = (ms + NORM_EPS)?.sqrt()?;
                Ok(x.broadcast_div(&rms)?.broadcast_mul(weight)?)
            }
            Norm::Identity => Ok(x.clone()),
        }
    }
}
