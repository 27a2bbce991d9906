use crate::edge::{inverse_frequency_weight, GraphEdge};
use crate::node::GraphNode;
use crate::snapshot::GraphSnapshot;
use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use yggdrasil_core::{
    BuildConfig, EdgeKind, EntityRecord, NodeId, NodeKind, RecordValidator, RejectReason, Result,
    ValidRecord, ValidationReport, YggdrasilError,
};

/// Key of one derived-edge membership group: the relationship kind plus the
/// shared value ("Dragon", "Rookie", a move name).
type GroupKey = (EdgeKind, String);

/// The graph construction engine. Consumes a complete record set and
/// produces a single immutable snapshot, or fails atomically with a
/// validation error; nothing partial is ever published.
pub struct GraphBuilder {
    config: BuildConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

impl GraphBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, records: &[EntityRecord]) -> Result<Arc<GraphSnapshot>> {
        let started = Instant::now();
        let mut report = ValidationReport::default();

        let accepted = self.validate(records, &mut report)?;
        debug!(
            "validated {} records ({} rejected)",
            accepted.len(),
            report.rejected_count()
        );

        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut entity_index: FxHashMap<String, NodeId> = FxHashMap::default();

        for record in &accepted {
            let id = nodes.len() as NodeId;
            entity_index.insert(record.key.clone(), id);
            nodes.push(GraphNode::digimon(id, record));
        }

        // Placeholders for referenced-but-absent entities, in first-reference
        // order so rebuilds reproduce identical ids.
        for record in &accepted {
            for key in record.evolves_from.iter().chain(record.related.iter()) {
                if entity_index.contains_key(key) {
                    continue;
                }
                if self.config.create_placeholders {
                    let id = nodes.len() as NodeId;
                    entity_index.insert(key.clone(), id);
                    nodes.push(GraphNode::placeholder(id, key.clone()));
                    report.placeholders += 1;
                } else {
                    report.dangling_refs += 1;
                }
            }
        }

        // Category materialization is a fixed-point pass: every category
        // node referenced by any valid entity exists before the first
        // entity-to-category edge is emitted.
        let mut category_index: FxHashMap<(NodeKind, String), NodeId> = FxHashMap::default();
        {
            let mut materialize = |kind: NodeKind, name: &str, nodes: &mut Vec<GraphNode>| {
                let key = (kind, name.to_string());
                if !category_index.contains_key(&key) {
                    let id = nodes.len() as NodeId;
                    nodes.push(GraphNode::category(id, kind, name));
                    category_index.insert(key, id);
                }
            };
            for record in &accepted {
                materialize(NodeKind::Level, &record.stage.to_string(), &mut nodes);
                for t in &record.types {
                    materialize(NodeKind::Type, t, &mut nodes);
                }
                materialize(NodeKind::Attribute, &record.attribute.to_string(), &mut nodes);
                for m in &record.moves {
                    materialize(NodeKind::Move, m, &mut nodes);
                }
            }
        }

        let mut edges = self.direct_edges(&accepted, &entity_index, &category_index);
        let direct_count = edges.len();
        edges.extend(self.derived_edges(&accepted, &entity_index, direct_count as u64));

        let snapshot = Arc::new(GraphSnapshot::assemble(
            nodes,
            edges,
            entity_index,
            category_index,
            report,
        ));
        info!(
            "built graph snapshot {}: {} nodes, {} edges ({} direct, {} derived), {} accepted / {} rejected records in {:?}",
            snapshot.snapshot_id,
            snapshot.node_count(),
            snapshot.edge_count(),
            direct_count,
            snapshot.edge_count() - direct_count,
            snapshot.report.accepted,
            snapshot.report.rejected_count(),
            started.elapsed(),
        );
        Ok(snapshot)
    }

    /// Per-record validation plus cross-record uniqueness. A byte-identical
    /// duplicate is rejected and reported; the same name with a conflicting
    /// payload poisons the whole build.
    fn validate(
        &self,
        records: &[EntityRecord],
        report: &mut ValidationReport,
    ) -> Result<Vec<ValidRecord>> {
        let mut accepted: Vec<ValidRecord> = Vec::with_capacity(records.len());
        let mut by_key: FxHashMap<String, usize> = FxHashMap::default();

        for record in records {
            match RecordValidator::validate(record, &mut report.missing) {
                Ok(valid) => {
                    if let Some(&first) = by_key.get(&valid.key) {
                        if accepted[first].same_payload(&valid) {
                            report.reject(&record.name, RejectReason::Duplicate);
                        } else {
                            return Err(YggdrasilError::Validation(format!(
                                "duplicate canonical name '{}' with conflicting attributes",
                                valid.key
                            )));
                        }
                        continue;
                    }
                    by_key.insert(valid.key.clone(), accepted.len());
                    accepted.push(valid);
                }
                Err(reason) => report.reject(&record.name, reason),
            }
        }
        report.accepted = accepted.len();
        Ok(accepted)
    }

    fn direct_edges(
        &self,
        accepted: &[ValidRecord],
        entity_index: &FxHashMap<String, NodeId>,
        category_index: &FxHashMap<(NodeKind, String), NodeId>,
    ) -> Vec<GraphEdge> {
        let category = |kind: NodeKind, name: &str| -> NodeId {
            // materialization pass guarantees presence
            category_index[&(kind, name.to_string())]
        };

        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut next_id = 0u64;
        let mut push = |edges: &mut Vec<GraphEdge>, from: NodeId, to: NodeId, kind: EdgeKind| {
            edges.push(GraphEdge::new(next_id, from, to, kind));
            next_id += 1;
        };

        for record in accepted {
            let from = entity_index[&record.key];
            push(
                &mut edges,
                from,
                category(NodeKind::Level, &record.stage.to_string()),
                EdgeKind::HasLevel,
            );
            for t in &record.types {
                push(&mut edges, from, category(NodeKind::Type, t), EdgeKind::HasType);
            }
            push(
                &mut edges,
                from,
                category(NodeKind::Attribute, &record.attribute.to_string()),
                EdgeKind::HasAttribute,
            );
            for m in &record.moves {
                push(&mut edges, from, category(NodeKind::Move, m), EdgeKind::CanUse);
            }
            // missing targets were either materialized as placeholders or
            // already counted as dangling during the placeholder pass
            for key in &record.evolves_from {
                if let Some(&to) = entity_index.get(key) {
                    push(&mut edges, from, to, EdgeKind::EvolvesFrom);
                }
            }
            for key in &record.related {
                if let Some(&to) = entity_index.get(key) {
                    push(&mut edges, from, to, EdgeKind::RelatedTo);
                }
            }
        }
        edges
    }

    /// Two-pass derived-edge computation: membership counting first, then
    /// pairwise emission within each group once all counts are known.
    /// Groups are independent and write disjoint edge sets, so emission is
    /// parallel per group; results are re-sorted into group order and only
    /// then given sequential ids.
    fn derived_edges(
        &self,
        accepted: &[ValidRecord],
        entity_index: &FxHashMap<String, NodeId>,
        id_base: u64,
    ) -> Vec<GraphEdge> {
        // Pass 1: full membership per shared value. Placeholders never
        // join a group, and unknown attributes form no group: shared
        // missingness is not similarity.
        let memberships: DashMap<GroupKey, Vec<NodeId>> = DashMap::default();
        accepted.par_iter().for_each(|record| {
            let id = entity_index[&record.key];
            let mut join = |kind: EdgeKind, value: &str| {
                memberships
                    .entry((kind, value.to_string()))
                    .or_default()
                    .push(id);
            };
            join(EdgeKind::SharesLevel, &record.stage.to_string());
            if record.attribute.is_known() {
                join(EdgeKind::SharesAttribute, &record.attribute.to_string());
            }
            for t in &record.types {
                join(EdgeKind::SharesType, t);
            }
            for m in &record.moves {
                join(EdgeKind::SharesMove, m);
            }
        });

        let mut groups: Vec<(GroupKey, Vec<NodeId>)> = memberships
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .collect();
        groups.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (_, members) in &mut groups {
            members.sort_unstable();
        }
        debug!("emitting derived edges for {} membership groups", groups.len());

        // Pass 2: O(k^2) pairwise emission batched per group, not a global
        // all-pairs scan.
        let per_group: Vec<Vec<GraphEdge>> = groups
            .par_iter()
            .map(|((kind, value), members)| {
                let weight = inverse_frequency_weight(members.len());
                let mut group_edges =
                    Vec::with_capacity(members.len() * (members.len() - 1) / 2);
                for (i, &a) in members.iter().enumerate() {
                    for &b in &members[i + 1..] {
                        group_edges.push(
                            GraphEdge::new(0, a, b, *kind)
                                .with_weight(weight)
                                .with_label(value.clone()),
                        );
                    }
                }
                group_edges
            })
            .collect();

        let mut edges: Vec<GraphEdge> = per_group.into_iter().flatten().collect();
        for (offset, edge) in edges.iter_mut().enumerate() {
            edge.id = id_base + offset as u64;
        }
        edges
    }
}

/// Convenience entry point: load from a store, then build.
pub async fn build_from_store(
    builder: &GraphBuilder,
    store: &dyn yggdrasil_core::EntityStore,
) -> Result<Arc<GraphSnapshot>> {
    let records = store.load_records().await?;
    if records.is_empty() {
        return Err(YggdrasilError::Validation(
            "entity store supplied no records".to_string(),
        ));
    }
    builder.build(&records)
}
