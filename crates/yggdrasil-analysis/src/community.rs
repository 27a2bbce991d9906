use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use yggdrasil_graph::EntityProjection;

/// Seed-parameterized community detection. Stochastic algorithms hide
/// behind this seam so the consensus layer can re-run them reproducibly;
/// nothing else in the analysis engine draws randomness.
pub trait Partitioner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns one community label per projection node. The same seed on
    /// the same projection must reproduce the same partition exactly.
    fn partition(&self, projection: &EntityProjection, seed: u64) -> Vec<usize>;
}

/// Weighted asynchronous label propagation. Both the node visiting order
/// and tie-breaking among equally heavy labels are driven by the seeded
/// generator, which is exactly the order/seed sensitivity the consensus
/// layer exists to tame.
#[derive(Debug, Clone)]
pub struct LabelPropagation {
    pub max_sweeps: usize,
}

impl Default for LabelPropagation {
    fn default() -> Self {
        Self { max_sweeps: 100 }
    }
}

impl Partitioner for LabelPropagation {
    fn name(&self) -> &'static str {
        "label_propagation"
    }

    fn partition(&self, projection: &EntityProjection, seed: u64) -> Vec<usize> {
        let n = projection.node_count();
        let mut labels: Vec<usize> = (0..n).collect();
        if n == 0 {
            return labels;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..n).collect();

        for _sweep in 0..self.max_sweeps {
            order.shuffle(&mut rng);
            let mut changes = 0usize;

            for &node in &order {
                if projection.adj[node].is_empty() {
                    continue;
                }
                let mut weight_by_label: FxHashMap<usize, f64> = FxHashMap::default();
                for &(neighbor, weight) in &projection.adj[node] {
                    *weight_by_label.entry(labels[neighbor]).or_insert(0.0) += weight;
                }

                let best_weight = weight_by_label
                    .values()
                    .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mut tied: Vec<usize> = weight_by_label
                    .iter()
                    .filter(|(_, &w)| w == best_weight)
                    .map(|(&label, _)| label)
                    .collect();
                tied.sort_unstable();
                let chosen = tied[rng.random_range(0..tied.len())];

                if chosen != labels[node] {
                    labels[node] = chosen;
                    changes += 1;
                }
            }

            if changes == 0 {
                break;
            }
        }

        renumber(&labels)
    }
}

/// Dense label renumbering in first-appearance order so partitions from
/// different runs compare structurally.
fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut mapping: FxHashMap<usize, usize> = FxHashMap::default();
    labels
        .iter()
        .map(|&label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect()
}
