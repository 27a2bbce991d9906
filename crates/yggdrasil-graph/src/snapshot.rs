use crate::edge::GraphEdge;
use crate::node::GraphNode;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use yggdrasil_core::{canonical_key, NodeId, NodeKind, ValidationReport};

/// One complete, immutable build of the graph. Constructed in a single
/// batch by the builder and published whole; downstream components hold
/// read-only `Arc`s and a published snapshot is never mutated.
#[derive(Debug)]
pub struct GraphSnapshot {
    pub snapshot_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub report: ValidationReport,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    out_adj: Vec<Vec<u32>>,
    in_adj: Vec<Vec<u32>>,
    entity_index: FxHashMap<String, NodeId>,
    category_index: FxHashMap<(NodeKind, String), NodeId>,
}

impl GraphSnapshot {
    pub(crate) fn assemble(
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        entity_index: FxHashMap<String, NodeId>,
        category_index: FxHashMap<(NodeKind, String), NodeId>,
        report: ValidationReport,
    ) -> Self {
        let mut out_adj = vec![Vec::new(); nodes.len()];
        let mut in_adj = vec![Vec::new(); nodes.len()];
        for (idx, edge) in edges.iter().enumerate() {
            out_adj[edge.from as usize].push(idx as u32);
            in_adj[edge.to as usize].push(idx as u32);
        }
        Self {
            snapshot_id: Uuid::new_v4(),
            built_at: Utc::now(),
            report,
            nodes,
            edges,
            out_adj,
            in_adj,
            entity_index,
            category_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| n.is_entity()).map(|n| n.id)
    }

    pub fn entity_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_entity()).count()
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&GraphNode> {
        self.entity_index
            .get(&canonical_key(name))
            .map(|&id| self.node(id))
    }

    pub fn category(&self, kind: NodeKind, name: &str) -> Option<&GraphNode> {
        self.category_index
            .get(&(kind, name.to_string()))
            .map(|&id| self.node(id))
    }

    pub fn edges_from(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.out_adj[id as usize].iter().map(|&i| &self.edges[i as usize])
    }

    pub fn edges_to(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.in_adj[id as usize].iter().map(|&i| &self.edges[i as usize])
    }

    /// All edges touching `id`, regardless of stored direction.
    pub fn edges_of(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.edges_from(id).chain(self.edges_to(id))
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.out_adj[id as usize].len() + self.in_adj[id as usize].len()
    }

    /// Collapses every entity-to-entity edge (evolution, related,
    /// shares-*) into one undirected weighted simple graph over Digimon
    /// nodes. Centrality and community detection run on this projection so
    /// category hub nodes cannot distort the measures; category structure
    /// still enters through the derived-edge weights.
    pub fn entity_projection(&self) -> EntityProjection {
        let ids: Vec<NodeId> = self.entity_ids().collect();
        let mut dense: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (i, &id) in ids.iter().enumerate() {
            dense.insert(id, i);
        }

        let mut weights: FxHashMap<(usize, usize), f64> = FxHashMap::default();
        for edge in &self.edges {
            if !edge.kind.is_entity_edge() {
                continue;
            }
            let (Some(&a), Some(&b)) = (dense.get(&edge.from), dense.get(&edge.to)) else {
                continue;
            };
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            *weights.entry(key).or_insert(0.0) += edge.weight;
        }

        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); ids.len()];
        let mut total_weight = 0.0;
        for (&(a, b), &w) in &weights {
            adj[a].push((b, w));
            adj[b].push((a, w));
            total_weight += w;
        }
        for list in &mut adj {
            list.sort_unstable_by_key(|&(n, _)| n);
        }

        EntityProjection {
            names: ids.iter().map(|&id| self.node(id).name.clone()).collect(),
            node_ids: ids,
            edge_count: weights.len(),
            total_weight,
            adj,
        }
    }
}

/// Undirected weighted simple graph over entity nodes, in dense indexing.
#[derive(Debug, Clone)]
pub struct EntityProjection {
    pub node_ids: Vec<NodeId>,
    pub names: Vec<String>,
    pub adj: Vec<Vec<(usize, f64)>>,
    pub edge_count: usize,
    pub total_weight: f64,
}

impl EntityProjection {
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn weighted_degree(&self, i: usize) -> f64 {
        self.adj[i].iter().map(|&(_, w)| w).sum()
    }
}

/// Serializable view of a snapshot for the persistence/export collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotExport {
    pub snapshot_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub report: ValidationReport,
}

impl GraphSnapshot {
    pub fn export(&self) -> SnapshotExport {
        SnapshotExport {
            snapshot_id: self.snapshot_id,
            built_at: self.built_at,
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            report: self.report.clone(),
        }
    }
}

/// Publication point for rebuilt snapshots. Readers are lock-free and see
/// either the previous complete snapshot or the new one, never a partial
/// state (RCU-style swap of the whole `Arc`).
#[derive(Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<GraphSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Arc<GraphSnapshot>) {
        self.current.store(Some(snapshot));
    }

    pub fn current(&self) -> Option<Arc<GraphSnapshot>> {
        self.current.load_full()
    }
}
