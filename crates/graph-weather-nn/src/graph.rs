//! Host edge lists to device tensors.
//!
//! A batch of `B` graphs is run as one disjoint graph: node `n` of batch
//! item `i` becomes node `i · num_nodes + n`, and the edge list is repeated
//! `B` times with those offsets. Edge attributes are repeated in the same
//! batch-major order.

use candle_core::{DType, Device, Tensor};
use graph_weather_mesh::EdgeList;

use crate::error::{ModelError, ModelResult};

/// Batched `[2, B·E]` u32 edge index: row 0 senders, row 1 receivers.
pub fn batched_edge_index(
    edges: &EdgeList,
    num_nodes: usize,
    batch: usize,
    device: &Device,
) -> ModelResult<Tensor> {
    if let Some(max) = edges.max_node() {
        if max as usize >= num_nodes {
            return Err(ModelError::InvalidInput(format!(
                "edge references node {} but graph has {} nodes",
                max, num_nodes
            )));
        }
    }
    let total = edges.len() * batch;
    let mut index = Vec::with_capacity(2 * total);
    for row in [edges.senders(), edges.receivers()] {
        for i in 0..batch {
            let offset = (i * num_nodes) as u32;
            index.extend(row.iter().map(|&n| n + offset));
        }
    }
    Ok(Tensor::from_vec(index, (2, total), device)?)
}

/// Structural edge attributes as an `[E, width]` f32 tensor.
pub fn edge_attributes(edges: &EdgeList, device: &Device) -> ModelResult<Tensor> {
    Ok(Tensor::from_slice(
        edges.attributes(),
        (edges.len(), edges.width()),
        device,
    )?)
}

/// Repeat `[E, D]` edge features for `batch` graphs: `[B·E, D]`.
pub fn repeat_edges(edge_features: &Tensor, batch: usize) -> ModelResult<Tensor> {
    if batch == 1 {
        return Ok(edge_features.clone());
    }
    Ok(edge_features.repeat((batch, 1))?)
}

/// Per-node in-degree as `[N, 1]` f32, clamped below at 1.
pub fn in_degree(receivers: &Tensor, num_nodes: usize) -> ModelResult<Tensor> {
    let ones = Tensor::ones((receivers.dim(0)?, 1), DType::F32, receivers.device())?;
    let degree = Tensor::zeros((num_nodes, 1), DType::F32, receivers.device())?
        .index_add(receivers, &ones, 0)?;
    Ok(degree.maximum(1.0)?)
}
