//! Graph representation for per-group clustering

pub mod subgraph;

pub use subgraph::{build_subgraphs, Subgraph};

/// Integer id of a node, as assigned in the vertex table
pub type NodeId = i64;

/// A directed link. Duplicates are allowed and kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

impl From<(NodeId, NodeId)> for Edge {
    fn from((source, target): (NodeId, NodeId)) -> Self {
        Self::new(source, target)
    }
}
