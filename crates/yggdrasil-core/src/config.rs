use crate::types::Stage;
use serde::{Deserialize, Serialize};

/// Graph construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Materialize placeholder nodes for referenced-but-absent entities.
    /// When false, dangling references are dropped (still reported).
    pub create_placeholders: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            create_placeholders: true,
        }
    }
}

/// Evolution chain extraction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Path depth bound. No legitimate chain outgrows the stage ordering;
    /// longer paths are flagged, not silently truncated.
    pub max_depth: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_depth: Stage::COUNT,
        }
    }
}

/// Network analysis options. Defaults follow the fixed contract values:
/// PageRank damping 0.85 at tolerance 1e-6, ten community runs minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub damping: f64,
    pub tolerance: f64,
    pub pagerank_max_iterations: usize,
    pub eigenvector_max_iterations: usize,
    /// Requested community-detection runs; clamped to at least
    /// `MIN_COMMUNITY_RUNS` because a single stochastic run is untrustworthy.
    pub community_runs: usize,
    pub max_label_sweeps: usize,
    pub base_seed: u64,
    /// Below this node count (or with zero edges) analysis short-circuits
    /// to an insufficient-structure result.
    pub min_nodes: usize,
    /// Co-membership fraction below which two entities are not merged
    /// during consensus clustering.
    pub consensus_threshold: f64,
}

impl AnalysisConfig {
    pub const MIN_COMMUNITY_RUNS: usize = 10;

    pub fn effective_runs(&self) -> usize {
        self.community_runs.max(Self::MIN_COMMUNITY_RUNS)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            pagerank_max_iterations: 100,
            eigenvector_max_iterations: 1000,
            community_runs: Self::MIN_COMMUNITY_RUNS,
            max_label_sweeps: 100,
            base_seed: 0x59_67_64_72,
            min_nodes: 3,
            consensus_threshold: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.damping, 0.85);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.effective_runs(), 10);
        assert_eq!(ChainConfig::default().max_depth, 6);
    }

    #[test]
    fn run_count_never_drops_below_minimum() {
        let config = AnalysisConfig {
            community_runs: 3,
            ..Default::default()
        };
        assert_eq!(config.effective_runs(), AnalysisConfig::MIN_COMMUNITY_RUNS);
    }

    #[test]
    fn configs_deserialize_from_partial_json() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"community_runs": 20}"#).unwrap();
        assert_eq!(config.community_runs, 20);
        assert_eq!(config.damping, 0.85);
    }
}
