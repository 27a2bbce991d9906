use serde::{Deserialize, Serialize};
use yggdrasil_core::{EdgeId, EdgeKind, NodeId};

/// One edge of the snapshot. Ids are sequential in emission order, so a
/// rebuild from identical input reproduces them exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub weight: f64,
    /// The shared value a derived edge was emitted for ("Dragon",
    /// "Rookie", a move name); None on direct edges.
    pub label: Option<String>,
}

impl GraphEdge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self {
            id,
            from,
            to,
            kind,
            weight: 1.0,
            label: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The endpoint opposite `node`, for undirected walks.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.from == node {
            self.to
        } else {
            self.from
        }
    }
}

/// Inverse-frequency weight for a derived edge: rarer shared values bind
/// tighter. Callers never emit edges for groups of size <= 1.
pub fn inverse_frequency_weight(group_size: usize) -> f64 {
    debug_assert!(group_size >= 2);
    1.0 / (group_size as f64).ln()
}
