//! Normalized MSE loss.
//!
//! Squared error per element, optionally divided by the variance of each
//! physical variable, averaged over features, weighted by `cos(lat)` of
//! each location (cell area shrinks towards the poles), then averaged over
//! locations and batch:
//!
//! L = mean_{b,l}( cos(lat_l) · mean_f( (pred - target)² / σ²_f ) )

use candle_core::{DType, Tensor, D};
use graph_weather_mesh::LatLon;

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone)]
pub struct NormalizedMseLoss {
    feature_variance: Tensor,
    weights: Tensor,
    normalize: bool,
}

impl NormalizedMseLoss {
    /// `feature_variance` must broadcast against predictions: `[F]` per
    /// variable or a full `[B, L, F]` tensor. It is only applied when
    /// `normalize` is set, and must then be strictly positive.
    pub fn new(
        feature_variance: Tensor,
        locations: &[LatLon],
        normalize: bool,
    ) -> ModelResult<Self> {
        let device = feature_variance.device().clone();
        let feature_variance = feature_variance.to_dtype(DType::F32)?;
        ensure_no_nan(&feature_variance, "feature variance")?;

        let weights: Vec<f32> = locations.iter().map(|l| l.area_weight() as f32).collect();
        let weights = Tensor::from_vec(weights, locations.len(), &device)?;
        ensure_no_nan(&weights, "latitude weights")?;

        Ok(Self {
            feature_variance,
            weights,
            normalize,
        })
    }

    /// Per-location `cos(lat)` weights, `[L]`.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Scalar loss for `[B, L, F]` predictions and targets.
    pub fn forward(&self, pred: &Tensor, target: &Tensor) -> ModelResult<Tensor> {
        if pred.dims() != target.dims() {
            return Err(ModelError::shape("loss target", pred.dims(), target.dims()));
        }
        let (_, locations, _) = pred.dims3()?;
        if locations != self.weights.dim(0)? {
            return Err(ModelError::shape(
                "loss locations",
                self.weights.dim(0)?,
                locations,
            ));
        }

        let mut out = (pred - target)?.sqr()?;
        if self.normalize {
            out = out.broadcast_div(&self.feature_variance)?;
        }
        ensure_no_nan(&out, "normalized squared error")?;

        let out = out.mean(D::Minus1)?.broadcast_mul(&self.weights)?;
        ensure_no_nan(&out, "latitude-weighted error")?;
        Ok(out.mean_all()?)
    }
}

fn ensure_no_nan(t: &Tensor, stage: &str) -> ModelResult<()> {
    let nan_count = t
        .ne(t)?
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()?;
    if nan_count > 0.0 {
        tracing::warn!("Rejecting loss input: {} NaN values in {}", nan_count, stage);
        return Err(ModelError::NonFinite {
            stage: stage.to_string(),
        });
    }
    Ok(())
}
