//! Location features onto the latent hex mesh.
//!
//! # Architecture
//!
//! ```text
//! features [B, L, F]  ++  h3 seeds [C, F]      (learned, zero-initialised)
//!          │
//!     node_mlp ──► [B·(L+C), node_dim]
//!          │
//!     InteractionBlock over location → cell edges (edge_mlp of [sin d, cos d])
//!          │
//!     keep cell nodes ──► [B·C, node_dim]
//!
//! latent mesh edges ──► latent_edge_mlp ──► [B·E, edge_dim], index [2, B·E]
//! ```
//!
//! Locations that share a cell are summed by the interaction block's
//! aggregation, so any location density works with any resolution.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::{Init, VarBuilder};
use graph_weather_mesh::{BipartiteGraph, HexMesh, LatLon, DISTANCE_ATTR_WIDTH};

use crate::config::{NormType, ProcessorConfig};
use crate::error::{ModelError, ModelResult};
use crate::graph::{batched_edge_index, edge_attributes, repeat_edges};
use crate::mlp::Mlp;
use crate::processor::InteractionBlock;

/// Node embeddings and latent mesh structure, batch-flattened.
#[derive(Debug, Clone)]
pub struct EncodedGraph {
    /// `[B·C, node_dim]`
    pub nodes: Tensor,
    /// `[2, B·E]` u32, node ids offset by `i · C` per batch item
    pub edge_index: Tensor,
    /// `[B·E, edge_dim]`
    pub edge_attr: Tensor,
    pub batch: usize,
}

/// Widths and sub-configs shared by the encoders.
#[derive(Debug, Clone, Copy)]
pub struct EncoderOptions<'a> {
    pub input_dim: usize,
    pub node_dim: usize,
    pub edge_dim: usize,
    pub processor: &'a ProcessorConfig,
    pub norm_type: NormType,
    pub chunk_rows: Option<usize>,
}

/// Layers common to the grid and observation encoders.
#[derive(Debug, Clone)]
pub(crate) struct MeshEncoder {
    mesh: Arc<HexMesh>,
    h3_nodes: Tensor,
    node_mlp: Mlp,
    edge_mlp: Mlp,
    latent_edge_mlp: Mlp,
    block: InteractionBlock,
    latent_attrs: Tensor,
    input_dim: usize,
    node_dim: usize,
}

impl MeshEncoder {
    pub(crate) fn new(
        mesh: Arc<HexMesh>,
        edge_attr_width: usize,
        opts: EncoderOptions<'_>,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        let processor = opts.processor;
        let h3_nodes = vb.get_with_hints(
            (mesh.num_cells(), opts.input_dim),
            "h3_nodes",
            Init::Const(0.0),
        )?;
        let node_mlp = Mlp::new(
            opts.input_dim,
            opts.node_dim,
            processor.hidden_dim_node,
            processor.hidden_layers_node,
            opts.norm_type,
            vb.pp("node_encoder"),
        )?
        .with_chunking(opts.chunk_rows);
        let edge_mlp = Mlp::new(
            edge_attr_width,
            opts.edge_dim,
            processor.hidden_dim_edge,
            processor.hidden_layers_edge,
            opts.norm_type,
            vb.pp("edge_encoder"),
        )?
        .with_chunking(opts.chunk_rows);
        let latent_edge_mlp = Mlp::new(
            DISTANCE_ATTR_WIDTH,
            opts.edge_dim,
            processor.hidden_dim_edge,
            processor.hidden_layers_edge,
            opts.norm_type,
            vb.pp("latent_edge_encoder"),
        )?;
        let block = InteractionBlock::new(
            opts.node_dim,
            opts.edge_dim,
            processor,
            opts.norm_type,
            vb.pp("graph_processor"),
        )?
        .with_chunking(opts.chunk_rows);
        let latent_attrs = edge_attributes(mesh.edges(), vb.device())?;

        Ok(Self {
            mesh,
            h3_nodes,
            node_mlp,
            edge_mlp,
            latent_edge_mlp,
            block,
            latent_attrs,
            input_dim: opts.input_dim,
            node_dim: opts.node_dim,
        })
    }

    pub(crate) fn mesh(&self) -> &Arc<HexMesh> {
        &self.mesh
    }

    pub(crate) fn forward(
        &self,
        features: &Tensor,
        graph: &BipartiteGraph,
    ) -> ModelResult<EncodedGraph> {
        let (batch, locations, input_dim) = features.dims3()?;
        if locations != graph.num_locations() || input_dim != self.input_dim {
            return Err(ModelError::shape(
                "encoder input",
                ("B", graph.num_locations(), self.input_dim),
                features.dims(),
            ));
        }
        let device = features.device();
        let cells = self.mesh.num_cells();
        let total = locations + cells;

        let seeds = self.h3_nodes.unsqueeze(0)?.repeat((batch, 1, 1))?;
        let nodes = Tensor::cat(&[features, &seeds], 1)?.reshape((batch * total, input_dim))?;
        let nodes = self.node_mlp.forward(&nodes)?;

        let edge_attr = self
            .edge_mlp
            .forward(&edge_attributes(graph.edges(), device)?)?;
        let edge_attr = repeat_edges(&edge_attr, batch)?;
        let edge_index = batched_edge_index(graph.edges(), total, batch, device)?;

        let (nodes, _) = self.block.forward(&nodes, &edge_index, &edge_attr)?;
        let nodes = nodes
            .reshape((batch, total, self.node_dim))?
            .narrow(1, locations, cells)?
            .reshape((batch * cells, self.node_dim))?;

        let latent_attr = repeat_edges(&self.latent_edge_mlp.forward(&self.latent_attrs)?, batch)?;
        let latent_index = batched_edge_index(self.mesh.edges(), cells, batch, device)?;

        tracing::debug!(
            "Encoded {} locations onto {} cells (batch {}, {} latent edges)",
            locations,
            cells,
            batch,
            self.mesh.edges().len()
        );

        Ok(EncodedGraph {
            nodes,
            edge_index: latent_index,
            edge_attr: latent_attr,
            batch,
        })
    }
}

// ============================================================================
// GRID ENCODER
// ============================================================================

/// Encoder for a fixed location set, with its graph built at construction.
#[derive(Debug, Clone)]
pub struct Encoder {
    inner: MeshEncoder,
    graph: BipartiteGraph,
}

impl Encoder {
    pub fn new(
        mesh: Arc<HexMesh>,
        locations: &[LatLon],
        opts: EncoderOptions<'_>,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        let graph = BipartiteGraph::to_mesh(&mesh, locations)?;
        let inner = MeshEncoder::new(mesh, DISTANCE_ATTR_WIDTH, opts, vb)?;
        Ok(Self { inner, graph })
    }

    pub fn graph(&self) -> &BipartiteGraph {
        &self.graph
    }

    pub fn mesh(&self) -> &Arc<HexMesh> {
        self.inner.mesh()
    }

    /// Encode `[B, L, input_dim]` features into latent mesh embeddings.
    pub fn forward(&self, features: &Tensor) -> ModelResult<EncodedGraph> {
        self.inner.forward(features, &self.graph)
    }
}
