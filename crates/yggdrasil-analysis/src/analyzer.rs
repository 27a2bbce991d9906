use crate::centrality::{compute_centrality, CentralityTable};
use crate::community::{LabelPropagation, Partitioner};
use crate::consensus::{detect_communities, CommunityOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;
use yggdrasil_core::{AnalysisConfig, CancellationToken, Result};
use yggdrasil_graph::{basic_metrics, BasicMetrics, GraphSnapshot};

/// Everything the analysis engine hands downstream, in one piece:
/// centrality table, consensus communities with modularity and stability
/// side by side, and the structural metrics of the analyzed projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub metrics: BasicMetrics,
    pub centrality: CentralityTable,
    pub communities: CommunityOutcome,
    pub analyzed_at: DateTime<Utc>,
}

/// The network analysis engine. Holds the configuration and the
/// seed-parameterized partitioner; reads published snapshots only.
pub struct NetworkAnalyzer {
    config: AnalysisConfig,
    partitioner: Box<dyn Partitioner>,
}

impl Default for NetworkAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl NetworkAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let partitioner = Box::new(LabelPropagation {
            max_sweeps: config.max_label_sweeps,
        });
        Self {
            config,
            partitioner,
        }
    }

    pub fn with_partitioner(mut self, partitioner: Box<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn analyze(&self, snapshot: &GraphSnapshot) -> Result<AnalysisBundle> {
        self.analyze_cancellable(snapshot, &CancellationToken::new())
    }

    pub fn analyze_cancellable(
        &self,
        snapshot: &GraphSnapshot,
        token: &CancellationToken,
    ) -> Result<AnalysisBundle> {
        let started = Instant::now();
        let projection = snapshot.entity_projection();
        let metrics = basic_metrics(&projection);
        let centrality = compute_centrality(&projection, &self.config, token)?;
        let communities =
            detect_communities(&projection, self.partitioner.as_ref(), &self.config, token)?;

        info!(
            "analyzed snapshot {} ({} entities, {} projection edges) in {:?}",
            snapshot.snapshot_id,
            projection.node_count(),
            projection.edge_count,
            started.elapsed()
        );
        Ok(AnalysisBundle {
            metrics,
            centrality,
            communities,
            analyzed_at: Utc::now(),
        })
    }
}
