use crate::community::Partitioner;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use yggdrasil_core::{AnalysisConfig, CancellationToken, Result, YggdrasilError};
use yggdrasil_graph::EntityProjection;

/// Final consensus partition with the two numbers that must always travel
/// together: modularity says the partition cuts the graph well, stability
/// says it was not an artifact of one lucky seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusPartition {
    /// Community id per projection node, renumbered densely.
    pub membership: Vec<usize>,
    /// Entity names per community, each sorted, ordered by community id.
    pub communities: Vec<Vec<String>>,
    pub community_count: usize,
    pub modularity: f64,
    /// `1 - mean(normalized VI)` over all run pairs, in [0, 1]. Values
    /// near zero mean the structure is noise and downstream reporting
    /// must flag it as low-confidence.
    pub stability: f64,
    pub runs: usize,
}

/// Community detection either produces a consensus or declines: trivial
/// graphs get a defined result instead of undefined clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommunityOutcome {
    Consensus(ConsensusPartition),
    InsufficientStructure { nodes: usize, edges: usize },
}

impl CommunityOutcome {
    pub fn as_consensus(&self) -> Option<&ConsensusPartition> {
        match self {
            CommunityOutcome::Consensus(partition) => Some(partition),
            CommunityOutcome::InsufficientStructure { .. } => None,
        }
    }
}

/// Runs the partitioner at least ten times with distinct seeds, builds the
/// co-membership matrix, and clusters that matrix into the final
/// partition. The token is polled between runs; cancellation yields no
/// result, never a partial one.
pub fn detect_communities(
    projection: &EntityProjection,
    partitioner: &dyn Partitioner,
    config: &AnalysisConfig,
    token: &CancellationToken,
) -> Result<CommunityOutcome> {
    let n = projection.node_count();
    if n < config.min_nodes || projection.edge_count == 0 {
        warn!(
            "insufficient structure for community detection: {} nodes, {} edges",
            n, projection.edge_count
        );
        return Ok(CommunityOutcome::InsufficientStructure {
            nodes: n,
            edges: projection.edge_count,
        });
    }

    let runs = config.effective_runs();
    let partitions: Vec<Option<Vec<usize>>> = (0..runs)
        .into_par_iter()
        .map(|run| {
            if token.is_cancelled() {
                return None;
            }
            let seed = config
                .base_seed
                .wrapping_add((run as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            Some(partitioner.partition(projection, seed))
        })
        .collect();
    if token.is_cancelled() {
        return Err(YggdrasilError::Cancelled);
    }
    let partitions: Vec<Vec<usize>> = partitions.into_iter().flatten().collect();
    debug!(
        "{} {} runs complete, building co-membership consensus",
        partitions.len(),
        partitioner.name()
    );

    let co = co_membership(&partitions, n);
    let membership = cluster_co_membership(&co, n, config.consensus_threshold);

    let community_count = membership.iter().copied().max().map_or(0, |m| m + 1);
    let mut communities: Vec<Vec<String>> = vec![Vec::new(); community_count];
    for (node, &community) in membership.iter().enumerate() {
        communities[community].push(projection.names[node].clone());
    }
    for members in &mut communities {
        members.sort_unstable();
    }

    let stability = stability_score(&partitions, n);
    let modularity = modularity(projection, &membership);
    info!(
        "consensus partition: {} communities over {} entities (modularity {:.3}, stability {:.3})",
        community_count, n, modularity, stability
    );

    Ok(CommunityOutcome::Consensus(ConsensusPartition {
        membership,
        communities,
        community_count,
        modularity,
        stability,
        runs: partitions.len(),
    }))
}

/// Row-major symmetric matrix of co-assignment fractions across runs.
fn co_membership(partitions: &[Vec<usize>], n: usize) -> Vec<f64> {
    let mut counts = vec![0u32; n * n];
    for partition in partitions {
        let mut by_label: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (node, &label) in partition.iter().enumerate() {
            by_label.entry(label).or_default().push(node);
        }
        for members in by_label.values() {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    counts[a * n + b] += 1;
                    counts[b * n + a] += 1;
                }
            }
        }
    }
    let scale = 1.0 / partitions.len() as f64;
    counts.into_iter().map(|c| c as f64 * scale).collect()
}

/// Average-linkage agglomerative clustering over co-membership
/// similarity: keep merging the two most co-assigned clusters while their
/// average co-assignment stays at or above the threshold.
fn cluster_co_membership(co: &[f64], n: usize, threshold: f64) -> Vec<usize> {
    let mut alive: Vec<bool> = vec![true; n];
    let mut sizes: Vec<usize> = vec![1; n];
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    // pairwise co-assignment sums between clusters, updated on merge
    let mut sums: Vec<f64> = co.to_vec();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !alive[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !alive[j] {
                    continue;
                }
                let average = sums[i * n + j] / (sizes[i] * sizes[j]) as f64;
                if best.map_or(true, |(_, _, b)| average > b) {
                    best = Some((i, j, average));
                }
            }
        }
        let Some((i, j, average)) = best else { break };
        if average < threshold {
            break;
        }

        // fold cluster j into i
        let moved = std::mem::take(&mut members[j]);
        members[i].extend(moved);
        sizes[i] += sizes[j];
        alive[j] = false;
        for k in 0..n {
            if alive[k] && k != i {
                sums[i * n + k] += sums[j * n + k];
                sums[k * n + i] = sums[i * n + k];
            }
        }
    }

    let mut membership = vec![0usize; n];
    let mut next = 0usize;
    for i in 0..n {
        if alive[i] && !members[i].is_empty() {
            for &node in &members[i] {
                membership[node] = next;
            }
            next += 1;
        }
    }
    membership
}

/// `1 - mean(VI / ln n)` over all unordered run pairs. Identical runs give
/// exactly 1; unrelated runs approach 0.
fn stability_score(partitions: &[Vec<usize>], n: usize) -> f64 {
    if partitions.len() < 2 || n < 2 {
        return 1.0;
    }
    let normalizer = (n as f64).ln();
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in partitions.iter().enumerate() {
        for b in &partitions[i + 1..] {
            total += variation_of_information(a, b, n) / normalizer;
            pairs += 1;
        }
    }
    (1.0 - total / pairs as f64).clamp(0.0, 1.0)
}

/// Information-theoretic distance between two partitions of the same node
/// set: `H(X) + H(Y) - 2 I(X;Y)`, in nats.
pub fn variation_of_information(a: &[usize], b: &[usize], n: usize) -> f64 {
    debug_assert_eq!(a.len(), n);
    debug_assert_eq!(b.len(), n);

    let mut counts_a: FxHashMap<usize, f64> = FxHashMap::default();
    let mut counts_b: FxHashMap<usize, f64> = FxHashMap::default();
    let mut joint: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    for i in 0..n {
        *counts_a.entry(a[i]).or_insert(0.0) += 1.0;
        *counts_b.entry(b[i]).or_insert(0.0) += 1.0;
        *joint.entry((a[i], b[i])).or_insert(0.0) += 1.0;
    }

    let n = n as f64;
    let entropy = |counts: &FxHashMap<usize, f64>| -> f64 {
        counts
            .values()
            .map(|&c| {
                let p = c / n;
                -p * p.ln()
            })
            .sum()
    };
    let h_a = entropy(&counts_a);
    let h_b = entropy(&counts_b);

    let mut mutual = 0.0;
    for (&(la, lb), &c) in &joint {
        let p = c / n;
        let pa = counts_a[&la] / n;
        let pb = counts_b[&lb] / n;
        mutual += p * (p / (pa * pb)).ln();
    }

    (h_a + h_b - 2.0 * mutual).max(0.0)
}

/// Weighted Newman modularity of a partition over the projection.
pub fn modularity(projection: &EntityProjection, membership: &[usize]) -> f64 {
    let total = projection.total_weight;
    if total <= 0.0 {
        return 0.0;
    }
    let community_count = membership.iter().copied().max().map_or(0, |m| m + 1);
    let mut internal = vec![0.0f64; community_count];
    let mut degree = vec![0.0f64; community_count];

    for (v, neighbors) in projection.adj.iter().enumerate() {
        for &(w, weight) in neighbors {
            degree[membership[v]] += weight;
            if v < w && membership[v] == membership[w] {
                internal[membership[v]] += weight;
            }
        }
    }

    (0..community_count)
        .map(|c| internal[c] / total - (degree[c] / (2.0 * total)).powi(2))
        .sum()
}
