use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;
use yggdrasil_core::{AnalysisConfig, CancellationToken, Result, YggdrasilError};
use yggdrasil_graph::EntityProjection;

/// Result of an iterative measure. Non-convergence is reported, never
/// passed off as a silent zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasureOutcome {
    Converged { scores: Vec<f64>, iterations: usize },
    DidNotConverge { iterations: usize },
}

impl MeasureOutcome {
    pub fn scores(&self, measure: &'static str) -> Result<&[f64]> {
        match self {
            MeasureOutcome::Converged { scores, .. } => Ok(scores),
            MeasureOutcome::DidNotConverge { iterations } => Err(YggdrasilError::Convergence {
                measure,
                iterations: *iterations,
            }),
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, MeasureOutcome::Converged { .. })
    }
}

/// Per-entity centrality scores, indexed like the projection's nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralityTable {
    pub names: Vec<String>,
    pub degree: Vec<f64>,
    pub betweenness: Vec<f64>,
    pub harmonic_closeness: Vec<f64>,
    pub eigenvector: MeasureOutcome,
    pub pagerank: MeasureOutcome,
}

/// Computes the full suite. The exact measures always succeed; eigenvector
/// and PageRank report per-measure convergence outcomes. The token is
/// polled between measures, and each measure parallelizes internally over
/// source nodes.
pub fn compute_centrality(
    projection: &EntityProjection,
    config: &AnalysisConfig,
    token: &CancellationToken,
) -> Result<CentralityTable> {
    let check = |token: &CancellationToken| -> Result<()> {
        if token.is_cancelled() {
            Err(YggdrasilError::Cancelled)
        } else {
            Ok(())
        }
    };

    check(token)?;
    let degree = degree_centrality(projection);
    check(token)?;
    let betweenness = betweenness_centrality(projection);
    check(token)?;
    let harmonic_closeness = harmonic_closeness_centrality(projection);
    check(token)?;
    let eigenvector = eigenvector_centrality(projection, config);
    check(token)?;
    let pagerank = pagerank_centrality(projection, config);

    debug!(
        "centrality suite complete over {} entities (eigenvector converged: {}, pagerank converged: {})",
        projection.node_count(),
        eigenvector.converged(),
        pagerank.converged(),
    );
    Ok(CentralityTable {
        names: projection.names.clone(),
        degree,
        betweenness,
        harmonic_closeness,
        eigenvector,
        pagerank,
    })
}

/// Fraction of other entities a node is directly tied to.
pub fn degree_centrality(projection: &EntityProjection) -> Vec<f64> {
    let n = projection.node_count();
    if n < 2 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;
    projection
        .adj
        .iter()
        .map(|neighbors| neighbors.len() as f64 * scale)
        .collect()
}

/// Brandes' algorithm over unweighted shortest paths, normalized for an
/// undirected graph. Derived-edge weights measure affinity, not distance,
/// so hop counts are the right geodesics here.
pub fn betweenness_centrality(projection: &EntityProjection) -> Vec<f64> {
    let n = projection.node_count();
    if n < 3 {
        return vec![0.0; n];
    }

    let partials = (0..n)
        .into_par_iter()
        .map(|source| {
            let mut partial = vec![0.0f64; n];
            let mut stack: Vec<usize> = Vec::new();
            let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut dist = vec![-1i64; n];

            sigma[source] = 1.0;
            dist[source] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(source);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &(w, _) in &projection.adj[v] {
                    if dist[w] < 0 {
                        dist[w] = dist[v] + 1;
                        queue.push_back(w);
                    }
                    if dist[w] == dist[v] + 1 {
                        sigma[w] += sigma[v];
                        preds[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &preds[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != source {
                    partial[w] += delta[w];
                }
            }
            partial
        })
        .reduce(
            || vec![0.0f64; n],
            |mut acc, partial| {
                for (a, p) in acc.iter_mut().zip(partial) {
                    *a += p;
                }
                acc
            },
        );

    // each unordered pair contributes from both endpoints as sources
    let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
    partials.into_iter().map(|b| b * scale).collect()
}

/// Harmonic closeness: sum of inverse hop distances. Finite on
/// disconnected graphs, where standard closeness is undefined.
pub fn harmonic_closeness_centrality(projection: &EntityProjection) -> Vec<f64> {
    let n = projection.node_count();
    if n < 2 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;

    (0..n)
        .into_par_iter()
        .map(|source| {
            let mut dist = vec![-1i64; n];
            dist[source] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(source);
            let mut total = 0.0;
            while let Some(v) = queue.pop_front() {
                for &(w, _) in &projection.adj[v] {
                    if dist[w] < 0 {
                        dist[w] = dist[v] + 1;
                        total += 1.0 / dist[w] as f64;
                        queue.push_back(w);
                    }
                }
            }
            total * scale
        })
        .collect()
}

/// Power iteration on A + I (the shift damps the oscillation bipartite
/// structures would otherwise sustain), weighted by edge affinity.
pub fn eigenvector_centrality(
    projection: &EntityProjection,
    config: &AnalysisConfig,
) -> MeasureOutcome {
    let n = projection.node_count();
    if n == 0 {
        return MeasureOutcome::Converged {
            scores: Vec::new(),
            iterations: 0,
        };
    }

    let mut x = vec![1.0 / n as f64; n];
    for iteration in 1..=config.eigenvector_max_iterations {
        let mut next = x.clone();
        for (v, neighbors) in projection.adj.iter().enumerate() {
            for &(w, weight) in neighbors {
                next[w] += x[v] * weight;
            }
        }
        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut next {
                *v /= norm;
            }
        }
        let drift: f64 = next
            .iter()
            .zip(&x)
            .map(|(a, b)| (a - b).abs())
            .sum();
        x = next;
        if drift < n as f64 * config.tolerance {
            return MeasureOutcome::Converged {
                scores: x,
                iterations: iteration,
            };
        }
    }
    MeasureOutcome::DidNotConverge {
        iterations: config.eigenvector_max_iterations,
    }
}

/// Weighted PageRank at the fixed 0.85 damping, with dangling mass spread
/// uniformly. Undirected projection edges count in both directions.
pub fn pagerank_centrality(
    projection: &EntityProjection,
    config: &AnalysisConfig,
) -> MeasureOutcome {
    let n = projection.node_count();
    if n == 0 {
        return MeasureOutcome::Converged {
            scores: Vec::new(),
            iterations: 0,
        };
    }

    let weighted_degree: Vec<f64> = (0..n).map(|i| projection.weighted_degree(i)).collect();
    let uniform = 1.0 / n as f64;
    let mut rank = vec![uniform; n];

    for iteration in 1..=config.pagerank_max_iterations {
        let dangling_mass: f64 = (0..n)
            .filter(|&i| weighted_degree[i] == 0.0)
            .map(|i| rank[i])
            .sum();
        let base = (1.0 - config.damping) * uniform + config.damping * dangling_mass * uniform;

        let mut next = vec![base; n];
        for (v, neighbors) in projection.adj.iter().enumerate() {
            if weighted_degree[v] == 0.0 {
                continue;
            }
            let share = config.damping * rank[v] / weighted_degree[v];
            for &(w, weight) in neighbors {
                next[w] += share * weight;
            }
        }

        let drift: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if drift < n as f64 * config.tolerance {
            return MeasureOutcome::Converged {
                scores: rank,
                iterations: iteration,
            };
        }
    }
    MeasureOutcome::DidNotConverge {
        iterations: config.pagerank_max_iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use yggdrasil_core::EntityRecord;
    use yggdrasil_graph::GraphBuilder;

    /// path graph A - B - C via a shared pair-wise type arrangement
    fn path_projection() -> EntityProjection {
        let snapshot = GraphBuilder::default()
            .build(&[
                EntityRecord::new("A", "Rookie").with_types(&["Left"]),
                EntityRecord::new("B", "Champion").with_types(&["Left", "Right"]),
                EntityRecord::new("C", "Mega").with_types(&["Right"]),
            ])
            .unwrap();
        snapshot.entity_projection()
    }

    #[test]
    fn degree_centrality_of_a_path() {
        let projection = path_projection();
        let degree = degree_centrality(&projection);
        // B touches both ends; A and C touch only B
        let b = projection.names.iter().position(|n| n == "B").unwrap();
        assert_relative_eq!(degree[b], 1.0);
        let a = projection.names.iter().position(|n| n == "A").unwrap();
        assert_relative_eq!(degree[a], 0.5);
    }

    #[test]
    fn betweenness_peaks_at_the_middle_of_a_path() {
        let projection = path_projection();
        let betweenness = betweenness_centrality(&projection);
        let b = projection.names.iter().position(|n| n == "B").unwrap();
        // B sits on the single A-C geodesic: normalized score 1
        assert_relative_eq!(betweenness[b], 1.0);
        let a = projection.names.iter().position(|n| n == "A").unwrap();
        assert_relative_eq!(betweenness[a], 0.0);
    }

    #[test]
    fn harmonic_closeness_is_finite_when_disconnected() {
        // two pairs with nothing in common across them: two components
        let snapshot = GraphBuilder::default()
            .build(&[
                EntityRecord::new("A", "Rookie").with_types(&["Pair1"]),
                EntityRecord::new("B", "Rookie").with_types(&["Pair1"]),
                EntityRecord::new("C", "Champion").with_types(&["Pair2"]),
                EntityRecord::new("D", "Mega").with_types(&["Pair2"]),
            ])
            .unwrap();
        let projection = snapshot.entity_projection();
        let metrics = yggdrasil_graph::basic_metrics(&projection);
        assert!(metrics.components > 1);

        let harmonic = harmonic_closeness_centrality(&projection);
        assert!(harmonic.iter().all(|v| v.is_finite()));
        assert!(harmonic.iter().any(|v| *v > 0.0));
    }

    #[test]
    fn eigenvector_converges_on_a_triangle() {
        let snapshot = GraphBuilder::default()
            .build(&[
                EntityRecord::new("A", "Rookie").with_types(&["Tri"]),
                EntityRecord::new("B", "Rookie").with_types(&["Tri"]),
                EntityRecord::new("C", "Rookie").with_types(&["Tri"]),
            ])
            .unwrap();
        let projection = snapshot.entity_projection();
        let outcome = eigenvector_centrality(&projection, &AnalysisConfig::default());
        let scores = outcome.scores("eigenvector").unwrap();
        // full symmetry: all three scores equal
        assert_relative_eq!(scores[0], scores[1], epsilon = 1e-6);
        assert_relative_eq!(scores[1], scores[2], epsilon = 1e-6);
    }

    #[test]
    fn pagerank_sums_to_one() {
        let projection = path_projection();
        let outcome = pagerank_centrality(&projection, &AnalysisConfig::default());
        let scores = outcome.scores("pagerank").unwrap();
        assert_relative_eq!(scores.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn failed_convergence_surfaces_as_error_on_demand() {
        let projection = path_projection();
        let config = AnalysisConfig {
            pagerank_max_iterations: 1,
            tolerance: 0.0,
            ..Default::default()
        };
        let outcome = pagerank_centrality(&projection, &config);
        assert!(!outcome.converged());
        assert!(matches!(
            outcome.scores("pagerank").unwrap_err(),
            YggdrasilError::Convergence {
                measure: "pagerank",
                iterations: 1
            }
        ));
    }

    #[test]
    fn cancellation_interrupts_the_suite() {
        let projection = path_projection();
        let token = CancellationToken::new();
        token.cancel();
        let err = compute_centrality(&projection, &AnalysisConfig::default(), &token).unwrap_err();
        assert!(matches!(err, YggdrasilError::Cancelled));
    }
}
