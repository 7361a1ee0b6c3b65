//! Latent mesh back onto output locations.
//!
//! ```text
//! cells [B·C, node_dim] ++ zero location seeds [B·L, node_dim]
//!          │
//!     InteractionBlock over cell → location edges (edge_mlp of [sin d, cos d])
//!          │
//!     keep location nodes ──► node_decoder ──► [B, L, output_dim]
//! ```

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use graph_weather_mesh::{BipartiteGraph, HexMesh, LatLon, DISTANCE_ATTR_WIDTH};

use crate::config::{DecoderConfig, NormType, ProcessorConfig};
use crate::error::{ModelError, ModelResult};
use crate::graph::{batched_edge_index, edge_attributes, repeat_edges};
use crate::mlp::Mlp;
use crate::processor::InteractionBlock;

#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions<'a> {
    pub node_dim: usize,
    pub edge_dim: usize,
    pub output_dim: usize,
    pub processor: &'a ProcessorConfig,
    pub decoder: &'a DecoderConfig,
    pub norm_type: NormType,
    pub chunk_rows: Option<usize>,
}

/// Decoder without a residual: produces the output state from the mesh alone.
#[derive(Debug, Clone)]
pub struct AssimilatorDecoder {
    mesh: Arc<HexMesh>,
    graph: BipartiteGraph,
    edge_attrs: Tensor,
    edge_mlp: Mlp,
    block: InteractionBlock,
    node_decoder: Mlp,
    node_dim: usize,
    output_dim: usize,
}

impl AssimilatorDecoder {
    pub fn new(
        mesh: Arc<HexMesh>,
        locations: &[LatLon],
        opts: DecoderOptions<'_>,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        let graph = BipartiteGraph::from_mesh(&mesh, locations)?;
        let edge_attrs = edge_attributes(graph.edges(), vb.device())?;
        let edge_mlp = Mlp::new(
            DISTANCE_ATTR_WIDTH,
            opts.edge_dim,
            opts.processor.hidden_dim_edge,
            opts.processor.hidden_layers_edge,
            opts.norm_type,
            vb.pp("edge_encoder"),
        )?
        .with_chunking(opts.chunk_rows);
        let block = InteractionBlock::new(
            opts.node_dim,
            opts.edge_dim,
            opts.processor,
            opts.norm_type,
            vb.pp("graph_processor"),
        )?
        .with_chunking(opts.chunk_rows);
        let node_decoder = Mlp::new(
            opts.node_dim,
            opts.output_dim,
            opts.decoder.hidden_dim,
            opts.decoder.hidden_layers,
            NormType::None,
            vb.pp("node_decoder"),
        )?
        .with_chunking(opts.chunk_rows);

        Ok(Self {
            mesh,
            graph,
            edge_attrs,
            edge_mlp,
            block,
            node_decoder,
            node_dim: opts.node_dim,
            output_dim: opts.output_dim,
        })
    }

    pub fn graph(&self) -> &BipartiteGraph {
        &self.graph
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Decode `[B·C, node_dim]` mesh embeddings into `[B, L, output_dim]`.
    pub fn forward(&self, x: &Tensor) -> ModelResult<Tensor> {
        let (rows, node_dim) = x.dims2()?;
        let cells = self.mesh.num_cells();
        if node_dim != self.node_dim || rows % cells != 0 || rows == 0 {
            return Err(ModelError::shape(
                "decoder input",
                ("B·cells", cells, self.node_dim),
                (rows, node_dim),
            ));
        }
        let batch = rows / cells;
        let locations = self.graph.num_locations();
        let total = cells + locations;
        let device = x.device();

        let seeds = Tensor::zeros((batch, locations, node_dim), x.dtype(), device)?;
        let nodes = Tensor::cat(&[&x.reshape((batch, cells, node_dim))?, &seeds], 1)?
            .reshape((batch * total, node_dim))?;

        let edge_attr = repeat_edges(&self.edge_mlp.forward(&self.edge_attrs)?, batch)?;
        let edge_index = batched_edge_index(self.graph.edges(), total, batch, device)?;
        let (nodes, _) = self.block.forward(&nodes, &edge_index, &edge_attr)?;

        let located = nodes
            .reshape((batch, total, node_dim))?
            .narrow(1, cells, locations)?
            .reshape((batch * locations, node_dim))?;
        let out = self.node_decoder.forward(&located)?;
        Ok(out.reshape((batch, locations, self.output_dim))?)
    }
}
