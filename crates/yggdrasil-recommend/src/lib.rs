use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use yggdrasil_analysis::{AnalysisBundle, CommunityOutcome};
use yggdrasil_core::canonical_key;
use yggdrasil_graph::{GraphNode, GraphSnapshot};

const EDGE_COMPONENT: f64 = 0.6;
const COMMUNITY_COMPONENT: f64 = 0.3;
const STAGE_COMPONENT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub score: f64,
}

/// Lightweight combiner over published results: pairwise scores from
/// derived-edge affinity, consensus co-membership and shared stage.
/// Read-only over the snapshot and the analysis bundle.
pub struct SimilarityScorer {
    snapshot: Arc<GraphSnapshot>,
    community_of: FxHashMap<String, usize>,
}

impl SimilarityScorer {
    pub fn new(snapshot: Arc<GraphSnapshot>, bundle: &AnalysisBundle) -> Self {
        let mut community_of = FxHashMap::default();
        if let CommunityOutcome::Consensus(partition) = &bundle.communities {
            for (community, members) in partition.communities.iter().enumerate() {
                for name in members {
                    community_of.insert(canonical_key(name), community);
                }
            }
        }
        Self {
            snapshot,
            community_of,
        }
    }

    /// Scores an entity pair in [0, 1). None when either name is unknown.
    pub fn score(&self, a: &str, b: &str) -> Option<f64> {
        let node_a = self.snapshot.entity_by_name(a)?;
        let node_b = self.snapshot.entity_by_name(b)?;
        if node_a.id == node_b.id {
            return Some(0.0);
        }
        Some(self.score_nodes(node_a, node_b))
    }

    fn score_nodes(&self, a: &GraphNode, b: &GraphNode) -> f64 {
        let shared_weight: f64 = self
            .snapshot
            .edges_of(a.id)
            .filter(|e| e.kind.is_derived() && e.other(a.id) == b.id)
            .map(|e| e.weight)
            .sum();
        // squash the unbounded affinity sum into [0, 1)
        let edge_score = shared_weight / (1.0 + shared_weight);

        let same_community = match (
            self.community_of.get(&canonical_key(&a.name)),
            self.community_of.get(&canonical_key(&b.name)),
        ) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        };

        let same_stage = match (a.entity.as_ref(), b.entity.as_ref()) {
            (Some(ea), Some(eb)) => {
                ea.stage.is_some() && ea.stage == eb.stage
            }
            _ => false,
        };

        let mut score = EDGE_COMPONENT * edge_score;
        if same_community {
            score += COMMUNITY_COMPONENT;
        }
        if same_stage {
            score += STAGE_COMPONENT;
        }
        score
    }

    /// Top-k peers of `name` by combined score, best first.
    pub fn recommend(&self, name: &str, limit: usize) -> Vec<Recommendation> {
        let Some(origin) = self.snapshot.entity_by_name(name) else {
            return Vec::new();
        };
        let mut scored: Vec<Recommendation> = self
            .snapshot
            .entity_ids()
            .filter(|&id| id != origin.id)
            .map(|id| self.snapshot.node(id))
            .filter(|node| !node.is_placeholder())
            .map(|node| Recommendation {
                name: node.name.clone(),
                score: self.score_nodes(origin, node),
            })
            .filter(|r| r.score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use yggdrasil_analysis::NetworkAnalyzer;
    use yggdrasil_core::EntityRecord;
    use yggdrasil_graph::GraphBuilder;

    fn scorer() -> SimilarityScorer {
        let snapshot = GraphBuilder::default()
            .build(&[
                EntityRecord::new("Agumon", "Rookie")
                    .with_types(&["Dino"])
                    .with_moves(&["Flame"]),
                EntityRecord::new("Gabumon", "Rookie")
                    .with_types(&["Dino"])
                    .with_moves(&["Flame"]),
                EntityRecord::new("Guilmon", "Rookie").with_types(&["Dino"]),
                EntityRecord::new("Whamon", "Mega").with_types(&["Sea Animal"]),
            ])
            .unwrap();
        let bundle = NetworkAnalyzer::default().analyze(&snapshot).unwrap();
        SimilarityScorer::new(snapshot, &bundle)
    }

    #[test]
    fn closer_pairs_score_higher() {
        let scorer = scorer();
        let tight = scorer.score("Agumon", "Gabumon").unwrap();
        let loose = scorer.score("Agumon", "Guilmon").unwrap();
        let none = scorer.score("Agumon", "Whamon").unwrap();
        assert!(tight > loose);
        assert!(loose > none);
        assert_relative_eq!(none, 0.0);
    }

    #[test]
    fn unknown_names_yield_none() {
        let scorer = scorer();
        assert!(scorer.score("Agumon", "Missingmon").is_none());
        assert!(scorer.recommend("Missingmon", 3).is_empty());
    }

    #[test]
    fn recommendations_rank_and_truncate() {
        let scorer = scorer();
        let recs = scorer.recommend("Agumon", 2);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].name, "Gabumon");
        assert!(recs[0].score >= recs[1].score);
    }

    #[test]
    fn self_similarity_is_zero() {
        let scorer = scorer();
        assert_relative_eq!(scorer.score("Agumon", "AGUMON").unwrap(), 0.0);
    }
}
