//! One round of message passing.
//!
//! ```text
//! e' = e + edge_mlp([x_sender, x_receiver, e])
//! m  = aggregate(e' at receiver)
//! x' = x + node_mlp([x, m])
//! ```

use candle_core::Tensor;
use candle_nn::VarBuilder;

use crate::config::{Aggregation, NormType, ProcessorConfig};
use crate::error::{ModelError, ModelResult};
use crate::graph::in_degree;
use crate::mlp::Mlp;

#[derive(Debug, Clone)]
pub struct InteractionBlock {
    edge_mlp: Mlp,
    node_mlp: Mlp,
    aggregation: Aggregation,
    node_dim: usize,
    edge_dim: usize,
}

impl InteractionBlock {
    pub fn new(
        node_dim: usize,
        edge_dim: usize,
        processor: &ProcessorConfig,
        norm_type: NormType,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        let edge_mlp = Mlp::new(
            2 * node_dim + edge_dim,
            edge_dim,
            processor.hidden_dim_edge,
            processor.hidden_layers_edge,
            norm_type,
            vb.pp("edge_mlp"),
        )?;
        let node_mlp = Mlp::new(
            node_dim + edge_dim,
            node_dim,
            processor.hidden_dim_node,
            processor.hidden_layers_node,
            norm_type,
            vb.pp("node_mlp"),
        )?;
        Ok(Self {
            edge_mlp,
            node_mlp,
            aggregation: processor.aggregation,
            node_dim,
            edge_dim,
        })
    }

    pub fn with_chunking(self, chunk_rows: Option<usize>) -> Self {
        Self {
            edge_mlp: self.edge_mlp.with_chunking(chunk_rows),
            node_mlp: self.node_mlp.with_chunking(chunk_rows),
            ..self
        }
    }

    /// Update nodes `[N, node_dim]` and edges `[E, edge_dim]` along
    /// `edge_index` `[2, E]`.
    pub fn forward(
        &self,
        x: &Tensor,
        edge_index: &Tensor,
        edge_attr: &Tensor,
    ) -> ModelResult<(Tensor, Tensor)> {
        let (num_nodes, node_dim) = x.dims2()?;
        let (num_edges, edge_dim) = edge_attr.dims2()?;
        if node_dim != self.node_dim || edge_dim != self.edge_dim {
            return Err(ModelError::shape(
                "interaction block",
                (self.node_dim, self.edge_dim),
                (node_dim, edge_dim),
            ));
        }
        let (rows, index_edges) = edge_index.dims2()?;
        if rows != 2 || index_edges != num_edges {
            return Err(ModelError::shape(
                "edge index",
                (2, num_edges),
                (rows, index_edges),
            ));
        }

        let senders = edge_index.get(0)?;
        let receivers = edge_index.get(1)?;

        let edge_input = Tensor::cat(
            &[
                &x.index_select(&senders, 0)?,
                &x.index_select(&receivers, 0)?,
                edge_attr,
            ],
            1,
        )?;
        let edges = (edge_attr + self.edge_mlp.forward(&edge_input)?)?;

        let messages = aggregate(&edges, &receivers, num_nodes, self.aggregation)?;

        let node_input = Tensor::cat(&[x, &messages], 1)?;
        let nodes = (x + self.node_mlp.forward(&node_input)?)?;
        Ok((nodes, edges))
    }
}

/// Scatter `[E, D]` edge features onto their receivers: `[N, D]`.
pub(crate) fn aggregate(
    edges: &Tensor,
    receivers: &Tensor,
    num_nodes: usize,
    aggregation: Aggregation,
) -> ModelResult<Tensor> {
    let (_, dim) = edges.dims2()?;
    let summed = Tensor::zeros((num_nodes, dim), edges.dtype(), edges.device())?
        .index_add(receivers, edges, 0)?;
    Ok(match aggregation {
        Aggregation::Sum => summed,
        Aggregation::Mean => summed.broadcast_div(&in_degree(receivers, num_nodes)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;
    use graph_weather_test_utils::uniform_values;

    fn small_config(aggregation: Aggregation) -> ProcessorConfig {
        ProcessorConfig {
            num_blocks: 1,
            hidden_dim_node: 8,
            hidden_layers_node: 1,
            hidden_dim_edge: 8,
            hidden_layers_edge: 1,
            aggregation,
        }
    }

    fn tensor(len: usize, shape: (usize, usize), seed: u64) -> Tensor {
        Tensor::new(uniform_values(len, seed), &Device::Cpu)
            .unwrap()
            .reshape(shape)
            .unwrap()
    }

    #[test]
    fn test_shapes_preserved() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let block =
            InteractionBlock::new(4, 3, &small_config(Aggregation::Sum), NormType::LayerNorm, vb)
                .unwrap();

        let x = tensor(20, (5, 4), 1);
        let e = tensor(18, (6, 3), 2);
        let index = Tensor::new(&[[0u32, 1, 2, 3, 4, 0], [1, 2, 3, 4, 0, 0]], &Device::Cpu)
            .unwrap();
        let (nodes, edges) = block.forward(&x, &index, &e).unwrap();
        assert_eq!(nodes.dims(), &[5, 4]);
        assert_eq!(edges.dims(), &[6, 3]);
    }

    #[test]
    fn test_isolated_node_keeps_residual_path() {
        // Node 2 receives nothing, so its update only sees a zero message.
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let block =
            InteractionBlock::new(2, 2, &small_config(Aggregation::Mean), NormType::None, vb)
                .unwrap();

        let x = tensor(6, (3, 2), 3);
        let e = tensor(2, (1, 2), 4);
        let index = Tensor::new(&[[0u32], [1]], &Device::Cpu).unwrap();
        let (nodes, _) = block.forward(&x, &index, &e).unwrap();
        let values: Vec<f32> = nodes.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    fn two_into_one() -> (Tensor, Tensor) {
        // Edges 0 and 1 land on node 1, edge 2 on node 0; node 2 receives nothing.
        let edges = Tensor::new(&[[1.0f32, 2.0], [3.0, 4.0], [10.0, 20.0]], &Device::Cpu).unwrap();
        let receivers = Tensor::new(&[1u32, 1, 0], &Device::Cpu).unwrap();
        (edges, receivers)
    }

    #[test]
    fn test_sum_aggregation_values() {
        let (edges, receivers) = two_into_one();
        let messages = aggregate(&edges, &receivers, 3, Aggregation::Sum).unwrap();
        assert_eq!(
            messages.to_vec2::<f32>().unwrap(),
            vec![vec![10.0, 20.0], vec![4.0, 6.0], vec![0.0, 0.0]]
        );
    }

    #[test]
    fn test_mean_aggregation_values() {
        let (edges, receivers) = two_into_one();
        let messages = aggregate(&edges, &receivers, 3, Aggregation::Mean).unwrap();
        assert_eq!(
            messages.to_vec2::<f32>().unwrap(),
            vec![vec![10.0, 20.0], vec![2.0, 3.0], vec![0.0, 0.0]]
        );
    }

    #[test]
    fn test_mismatched_index_rejected() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let block =
            InteractionBlock::new(2, 2, &small_config(Aggregation::Sum), NormType::None, vb)
                .unwrap();
        let x = tensor(6, (3, 2), 5);
        let e = tensor(4, (2, 2), 6);
        let index = Tensor::new(&[[0u32], [1]], &Device::Cpu).unwrap();
        assert!(matches!(
            block.forward(&x, &index, &e),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
