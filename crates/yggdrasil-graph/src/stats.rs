use crate::snapshot::{EntityProjection, GraphSnapshot};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use yggdrasil_core::{EdgeKind, NodeKind};

/// Node and edge counts per kind for a published snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub node_counts: BTreeMap<String, usize>,
    pub edge_counts: BTreeMap<String, usize>,
    pub total_nodes: usize,
    pub total_edges: usize,
}

pub fn snapshot_stats(snapshot: &GraphSnapshot) -> SnapshotStats {
    let mut node_counts: BTreeMap<String, usize> = BTreeMap::new();
    for node in snapshot.nodes() {
        *node_counts.entry(node.kind.to_string()).or_insert(0) += 1;
    }
    let mut edge_counts: BTreeMap<String, usize> = BTreeMap::new();
    for edge in snapshot.edges() {
        *edge_counts.entry(edge.kind.to_string()).or_insert(0) += 1;
    }
    SnapshotStats {
        node_counts,
        edge_counts,
        total_nodes: snapshot.node_count(),
        total_edges: snapshot.edge_count(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub name: String,
    pub count: usize,
}

/// Entities per category value, most common first (ties by name).
fn category_distribution(snapshot: &GraphSnapshot, kind: NodeKind, via: EdgeKind) -> Vec<DistributionEntry> {
    let mut entries: Vec<DistributionEntry> = snapshot
        .nodes()
        .filter(|n| n.kind == kind)
        .map(|n| DistributionEntry {
            name: n.name.clone(),
            count: snapshot.edges_to(n.id).filter(|e| e.kind == via).count(),
        })
        .collect();
    entries.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries
}

pub fn level_distribution(snapshot: &GraphSnapshot) -> Vec<DistributionEntry> {
    category_distribution(snapshot, NodeKind::Level, EdgeKind::HasLevel)
}

pub fn type_distribution(snapshot: &GraphSnapshot) -> Vec<DistributionEntry> {
    category_distribution(snapshot, NodeKind::Type, EdgeKind::HasType)
}

pub fn attribute_distribution(snapshot: &GraphSnapshot) -> Vec<DistributionEntry> {
    category_distribution(snapshot, NodeKind::Attribute, EdgeKind::HasAttribute)
}

/// Entities ranked by total relationship count (any kind, any direction).
pub fn most_connected(snapshot: &GraphSnapshot, limit: usize) -> Vec<DistributionEntry> {
    let mut entries: Vec<DistributionEntry> = snapshot
        .entity_ids()
        .map(|id| DistributionEntry {
            name: snapshot.node(id).name.clone(),
            count: snapshot.degree(id),
        })
        .collect();
    entries.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMove {
    pub name: String,
    pub user_count: usize,
    /// Up to five example users.
    pub sample: Vec<String>,
}

/// Moves known by more than one entity, heaviest sharing first.
pub fn shared_moves(snapshot: &GraphSnapshot, limit: usize) -> Vec<SharedMove> {
    let mut moves: Vec<SharedMove> = snapshot
        .nodes()
        .filter(|n| n.kind == NodeKind::Move)
        .filter_map(|n| {
            let mut users: Vec<String> = snapshot
                .edges_to(n.id)
                .filter(|e| e.kind == EdgeKind::CanUse)
                .map(|e| snapshot.node(e.from).name.clone())
                .collect();
            if users.len() < 2 {
                return None;
            }
            users.sort_unstable();
            Some(SharedMove {
                name: n.name.clone(),
                user_count: users.len(),
                sample: users.into_iter().take(5).collect(),
            })
        })
        .collect();
    moves.sort_unstable_by(|a, b| {
        b.user_count
            .cmp(&a.user_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    moves.truncate(limit);
    moves
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAttributeCell {
    pub type_name: String,
    pub attribute: String,
    pub count: usize,
}

/// Co-occurrence matrix of type tags against attributes.
pub fn type_attribute_matrix(snapshot: &GraphSnapshot) -> Vec<TypeAttributeCell> {
    let mut cells: FxHashMap<(String, String), usize> = FxHashMap::default();
    for id in snapshot.entity_ids() {
        let Some(entity) = snapshot.node(id).entity.as_ref() else {
            continue;
        };
        if entity.placeholder {
            continue;
        }
        for t in &entity.types {
            *cells
                .entry((t.clone(), entity.attribute.to_string()))
                .or_insert(0) += 1;
        }
    }
    let mut out: Vec<TypeAttributeCell> = cells
        .into_iter()
        .map(|((type_name, attribute), count)| TypeAttributeCell {
            type_name,
            attribute,
            count,
        })
        .collect();
    out.sort_unstable_by(|a, b| {
        a.type_name
            .cmp(&b.type_name)
            .then_with(|| a.attribute.cmp(&b.attribute))
    });
    out
}

/// Structural metrics of the entity projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub connected: bool,
    pub components: usize,
    pub average_degree: f64,
}

pub fn basic_metrics(projection: &EntityProjection) -> BasicMetrics {
    let n = projection.node_count();
    let m = projection.edge_count;
    let density = if n > 1 {
        2.0 * m as f64 / (n as f64 * (n - 1) as f64)
    } else {
        0.0
    };
    let average_degree = if n > 0 {
        projection.adj.iter().map(Vec::len).sum::<usize>() as f64 / n as f64
    } else {
        0.0
    };
    let components = component_count(projection);
    BasicMetrics {
        nodes: n,
        edges: m,
        density,
        connected: n > 0 && components == 1,
        components,
        average_degree,
    }
}

fn component_count(projection: &EntityProjection) -> usize {
    let n = projection.node_count();
    let mut seen = vec![false; n];
    let mut components = 0;
    let mut stack = Vec::new();
    for start in 0..n {
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        stack.push(start);
        while let Some(node) = stack.pop() {
            for &(next, _) in &projection.adj[node] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
    }
    components
}
