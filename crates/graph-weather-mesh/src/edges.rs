//! Directed edge lists with dense per-edge attributes.

/// Directed edges in COO form with a fixed-width attribute row per edge.
///
/// Senders and receivers index into the node space of the graph that owns
/// the list. Attributes are stored row-major: edge `e` owns
/// `attributes[e * width..(e + 1) * width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeList {
    senders: Vec<u32>,
    receivers: Vec<u32>,
    attributes: Vec<f32>,
    width: usize,
}

impl EdgeList {
    /// Create an empty list whose attribute rows have `width` entries.
    pub fn with_capacity(width: usize, capacity: usize) -> Self {
        Self {
            senders: Vec::with_capacity(capacity),
            receivers: Vec::with_capacity(capacity),
            attributes: Vec::with_capacity(capacity * width),
            width,
        }
    }

    /// Append an edge.
    ///
    /// # Panics
    /// Debug builds assert that `attrs.len() == width`.
    pub fn push(&mut self, sender: u32, receiver: u32, attrs: &[f32]) {
        debug_assert_eq!(attrs.len(), self.width);
        self.senders.push(sender);
        self.receivers.push(receiver);
        self.attributes.extend_from_slice(attrs);
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// True when there are no edges.
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Attribute width.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn senders(&self) -> &[u32] {
        &self.senders
    }

    pub fn receivers(&self) -> &[u32] {
        &self.receivers
    }

    /// Row-major attribute matrix `[len, width]`.
    pub fn attributes(&self) -> &[f32] {
        &self.attributes
    }

    /// Attribute row of edge `e`.
    pub fn attribute_row(&self, e: usize) -> &[f32] {
        &self.attributes[e * self.width..(e + 1) * self.width]
    }

    /// Number of incoming edges per receiver, for a node space of `num_nodes`.
    pub fn in_degree(&self, num_nodes: usize) -> Vec<u32> {
        let mut degree = vec![0u32; num_nodes];
        for &r in &self.receivers {
            degree[r as usize] += 1;
        }
        degree
    }

    /// Largest node index referenced by any edge, if any.
    pub fn max_node(&self) -> Option<u32> {
        self.senders
            .iter()
            .chain(self.receivers.iter())
            .copied()
            .max()
    }
}
