//! Message-passing processor over the latent hex mesh.
//!
//! A stack of [`InteractionBlock`]s applied in sequence. Each block keeps
//! node and edge widths unchanged, so the stack threads both through and
//! returns node embeddings with the input's shape.

mod interaction;

pub use interaction::InteractionBlock;

use candle_core::Tensor;
use candle_nn::VarBuilder;

use crate::config::{NormType, ProcessorConfig};
use crate::error::ModelResult;

#[derive(Debug, Clone)]
pub struct Processor {
    blocks: Vec<InteractionBlock>,
}

impl Processor {
    pub fn new(
        node_dim: usize,
        edge_dim: usize,
        config: &ProcessorConfig,
        norm_type: NormType,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        let blocks = (0..config.num_blocks)
            .map(|i| {
                InteractionBlock::new(
                    node_dim,
                    edge_dim,
                    config,
                    norm_type,
                    vb.pp(format!("blocks.{}", i)),
                )
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self { blocks })
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Refine node embeddings `[N, node_dim]` over `edge_index` `[2, E]`
    /// with edge features `[E, edge_dim]`.
    pub fn forward(&self, x: &Tensor, edge_index: &Tensor, edge_attr: &Tensor) -> ModelResult<Tensor> {
        self.forward_blocks(x, edge_index, edge_attr, self.blocks.len())
    }

    /// Like [`Processor::forward`] but stops after the first `num_blocks`
    /// blocks.
    pub fn forward_blocks(
        &self,
        x: &Tensor,
        edge_index: &Tensor,
        edge_attr: &Tensor,
        num_blocks: usize,
    ) -> ModelResult<Tensor> {
        let mut x = x.clone();
        let mut edge_attr = edge_attr.clone();
        for block in self.blocks.iter().take(num_blocks) {
            let (nodes, edges) = block.forward(&x, edge_index, &edge_attr)?;
            x = nodes;
            edge_attr = edges;
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_block_count_and_partial_run() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = ProcessorConfig {
            num_blocks: 3,
            hidden_dim_node: 8,
            hidden_dim_edge: 8,
            ..Default::default()
        };
        let processor = Processor::new(4, 4, &config, NormType::LayerNorm, vb).unwrap();
        assert_eq!(processor.num_blocks(), 3);

        let x = Tensor::ones((3, 4), DType::F32, &Device::Cpu).unwrap();
        let e = Tensor::ones((2, 4), DType::F32, &Device::Cpu).unwrap();
        let index = Tensor::new(&[[0u32, 1], [1, 2]], &Device::Cpu).unwrap();

        let identity = processor.forward_blocks(&x, &index, &e, 0).unwrap();
        let ones: Vec<f32> = identity.flatten_all().unwrap().to_vec1().unwrap();
        assert!(ones.iter().all(|&v| v == 1.0));

        let out = processor.forward(&x, &index, &e).unwrap();
        assert_eq!(out.dims(), &[3, 4]);
    }
}
