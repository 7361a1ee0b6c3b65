//! Physical constraint layer.
//!
//! Corrects a gridded prediction `[B, C, H, W]` so that a conserved
//! statistic matches a reference `[B, C', H, W]` over every region of the
//! grid. Regions are `rows × cols` blocks tiling the grid; by default the
//! whole grid is one region.
//!
//! | kind           | correction per region                      | conserves |
//! |----------------|--------------------------------------------|-----------|
//! | Additive       | `p + (mean(r) - mean(p))`                  | mean      |
//! | Multiplicative | `p · mean(r) / floor(mean(p))`             | mean      |
//! | Softmax        | `sum(r) · softmax(p)`                      | sum       |
//!
//! If `C` is a multiple of `C'` the reference is tiled along channels;
//! any other ratio is rejected.

use candle_core::{Tensor, D};

use crate::config::{ConstraintConfig, ConstraintKind};
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone)]
pub struct ConstraintLayer {
    kind: ConstraintKind,
    grid: (usize, usize),
    region: (usize, usize),
    floor: f64,
}

impl ConstraintLayer {
    pub fn new(grid: (usize, usize), config: &ConstraintConfig) -> ModelResult<Self> {
        config.validate()?;
        let (rows, cols) = grid;
        let region = match config.region {
            Some([r, c]) => (r, c),
            None => grid,
        };
        if rows == 0 || cols == 0 || rows % region.0 != 0 || cols % region.1 != 0 {
            return Err(ModelError::config(format!(
                "constraint region {:?} does not tile grid {:?}",
                region, grid
            )));
        }
        tracing::debug!(
            "Constraint layer: {} over {}x{} grid in {}x{} regions",
            config.kind.as_str(),
            rows,
            cols,
            region.0,
            region.1
        );
        Ok(Self {
            kind: config.kind,
            grid,
            region,
            floor: config.multiplicative_floor,
        })
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn grid(&self) -> (usize, usize) {
        self.grid
    }

    pub fn region(&self) -> (usize, usize) {
        self.region
    }

    /// Correct `prediction` against `reference`, both `[B, C, H, W]`.
    pub fn forward(&self, prediction: &Tensor, reference: &Tensor) -> ModelResult<Tensor> {
        let (batch, channels, rows, cols) = prediction.dims4()?;
        let (ref_batch, ref_channels, ref_rows, ref_cols) = reference.dims4()?;
        if (rows, cols) != self.grid {
            return Err(ModelError::shape("constraint prediction grid", self.grid, (rows, cols)));
        }
        if (ref_batch, ref_rows, ref_cols) != (batch, rows, cols) {
            return Err(ModelError::shape(
                "constraint reference",
                (batch, rows, cols),
                (ref_batch, ref_rows, ref_cols),
            ));
        }
        let reference = tile_channels(reference, ref_channels, channels)?;

        let p = self.split_regions(prediction)?;
        let r = self.split_regions(&reference)?;
        let corrected = match self.kind {
            ConstraintKind::Additive => {
                let shift = (r.mean_keepdim(D::Minus1)? - p.mean_keepdim(D::Minus1)?)?;
                p.broadcast_add(&shift)?
            }
            ConstraintKind::Multiplicative => {
                let p_mean = p.mean_keepdim(D::Minus1)?;
                let denom = p_mean
                    .ge(0.0)?
                    .where_cond(&p_mean.maximum(self.floor)?, &p_mean.minimum(-self.floor)?)?;
                let scale = (r.mean_keepdim(D::Minus1)? / denom)?;
                p.broadcast_mul(&scale)?
            }
            ConstraintKind::Softmax => {
                let total = r.sum_keepdim(D::Minus1)?;
                candle_nn::ops::softmax(&p, D::Minus1)?.broadcast_mul(&total)?
            }
        };
        self.merge_regions(&corrected, batch, channels)
    }

    /// `[B, C, H, W]` → `[B, C, nh, nw, rh·rw]`
    fn split_regions(&self, x: &Tensor) -> ModelResult<Tensor> {
        let (batch, channels, rows, cols) = x.dims4()?;
        let (rh, rw) = self.region;
        let (nh, nw) = (rows / rh, cols / rw);
        Ok(x
            .reshape(vec![batch, channels, nh, rh, nw, rw])?
            .transpose(3, 4)?
            .contiguous()?
            .reshape(vec![batch, channels, nh, nw, rh * rw])?)
    }

    /// Inverse of [`Self::split_regions`].
    fn merge_regions(&self, x: &Tensor, batch: usize, channels: usize) -> ModelResult<Tensor> {
        let (rows, cols) = self.grid;
        let (rh, rw) = self.region;
        let (nh, nw) = (rows / rh, cols / rw);
        Ok(x
            .reshape(vec![batch, channels, nh, nw, rh, rw])?
            .transpose(3, 4)?
            .contiguous()?
            .reshape((batch, channels, rows, cols))?)
    }
}

fn tile_channels(reference: &Tensor, have: usize, want: usize) -> ModelResult<Tensor> {
    if have == want {
        return Ok(reference.clone());
    }
    if have == 0 || want % have != 0 {
        return Err(ModelError::ChannelRatio {
            prediction: want,
            reference: have,
        });
    }
    Ok(reference.repeat((1, want / have, 1, 1))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use graph_weather_test_utils::uniform_values;

    fn grid_tensor(values: Vec<f32>, shape: (usize, usize, usize, usize)) -> Tensor {
        Tensor::new(values, &Device::Cpu).unwrap().reshape(shape).unwrap()
    }

    fn layer(kind: ConstraintKind, grid: (usize, usize), region: Option<[usize; 2]>) -> ConstraintLayer {
        let config = ConstraintConfig {
            kind,
            region,
            ..Default::default()
        };
        ConstraintLayer::new(grid, &config).unwrap()
    }

    /// Per (batch, channel, region) mean, flattened.
    fn region_stat(layer: &ConstraintLayer, x: &Tensor, sum: bool) -> Vec<f32> {
        let regions = layer.split_regions(x).unwrap();
        let stat = if sum {
            regions.sum(D::Minus1).unwrap()
        } else {
            regions.mean(D::Minus1).unwrap()
        };
        stat.flatten_all().unwrap().to_vec1().unwrap()
    }

    fn assert_close(a: &[f32], b: &[f32], tol: f32) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < tol, "{} vs {}", x, y);
        }
    }

    // =========================================================================
    // CONSERVATION
    // =========================================================================

    #[test]
    fn test_additive_conserves_mean() {
        let layer = layer(ConstraintKind::Additive, (4, 6), None);
        let p = grid_tensor(uniform_values(2 * 3 * 24, 1), (2, 3, 4, 6));
        let r = grid_tensor(uniform_values(2 * 3 * 24, 2), (2, 3, 4, 6));
        let out = layer.forward(&p, &r).unwrap();
        assert_eq!(out.dims(), &[2, 3, 4, 6]);
        assert_close(&region_stat(&layer, &out, false), &region_stat(&layer, &r, false), 1e-5);
    }

    #[test]
    fn test_additive_regions_conserve_each_block() {
        let layer = layer(ConstraintKind::Additive, (4, 6), Some([2, 3]));
        let p = grid_tensor(uniform_values(24, 3), (1, 1, 4, 6));
        let r = grid_tensor(uniform_values(24, 4), (1, 1, 4, 6));
        let out = layer.forward(&p, &r).unwrap();
        let expected = region_stat(&layer, &r, false);
        assert_eq!(expected.len(), 4);
        assert_close(&region_stat(&layer, &out, false), &expected, 1e-5);
    }

    #[test]
    fn test_multiplicative_conserves_mean() {
        let layer = layer(ConstraintKind::Multiplicative, (2, 2), None);
        let p = grid_tensor(vec![1.0, 2.0, 3.0, 4.0], (1, 1, 2, 2));
        let r = grid_tensor(vec![5.0, 5.0, 5.0, 5.0], (1, 1, 2, 2));
        let out: Vec<f32> = layer.forward(&p, &r).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        // scale = 5 / 2.5
        assert_close(&out, &[2.0, 4.0, 6.0, 8.0], 1e-5);
    }

    #[test]
    fn test_multiplicative_floor_keeps_finite() {
        let layer = layer(ConstraintKind::Multiplicative, (1, 2), None);
        let p = grid_tensor(vec![-1.0, 1.0], (1, 1, 1, 2));
        let r = grid_tensor(vec![1.0, 1.0], (1, 1, 1, 2));
        let out: Vec<f32> = layer.forward(&p, &r).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
        // mean(p) = 0 is floored to +1e-6
        assert!((out[1] - 1e6).abs() / 1e6 < 1e-3);
    }

    #[test]
    fn test_softmax_conserves_sum_and_sign() {
        let layer = layer(ConstraintKind::Softmax, (3, 4), None);
        let p = grid_tensor(uniform_values(2 * 12, 5), (1, 2, 3, 4));
        let r = (grid_tensor(uniform_values(2 * 12, 6), (1, 2, 3, 4)) + 1.5).unwrap();
        let out = layer.forward(&p, &r).unwrap();
        assert_close(&region_stat(&layer, &out, true), &region_stat(&layer, &r, true), 1e-4);
        let values: Vec<f32> = out.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    // =========================================================================
    // CHANNELS AND SHAPES
    // =========================================================================

    #[test]
    fn test_reference_tiled_across_channels() {
        let layer = layer(ConstraintKind::Additive, (2, 2), None);
        let p = grid_tensor(vec![0.0; 16], (1, 4, 2, 2));
        let r = grid_tensor(vec![1.0, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 3.0], (1, 2, 2, 2));
        let out = layer.forward(&p, &r).unwrap();
        let means: Vec<f32> = out
            .mean_keepdim(3)
            .unwrap()
            .mean_keepdim(2)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_close(&means, &[1.0, 3.0, 1.0, 3.0], 1e-6);
    }

    #[test]
    fn test_non_integer_channel_ratio() {
        let layer = layer(ConstraintKind::Additive, (2, 2), None);
        let p = grid_tensor(vec![0.0; 12], (1, 3, 2, 2));
        let r = grid_tensor(vec![0.0; 8], (1, 2, 2, 2));
        assert!(matches!(
            layer.forward(&p, &r),
            Err(ModelError::ChannelRatio {
                prediction: 3,
                reference: 2
            })
        ));
    }

    #[test]
    fn test_region_must_tile_grid() {
        let config = ConstraintConfig {
            region: Some([3, 2]),
            ..Default::default()
        };
        assert!(ConstraintLayer::new((4, 4), &config).is_err());
    }

    #[test]
    fn test_wrong_grid_rejected() {
        let layer = layer(ConstraintKind::Softmax, (2, 2), None);
        let p = grid_tensor(vec![0.0; 6], (1, 1, 2, 3));
        assert!(layer.forward(&p, &p).is_err());
    }
}
