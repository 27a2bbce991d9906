use yggdrasil_analysis::{
    detect_communities, CommunityOutcome, LabelPropagation, NetworkAnalyzer,
};
use yggdrasil_core::{AnalysisConfig, CancellationToken, EntityRecord, YggdrasilError};
use yggdrasil_graph::{EntityProjection, GraphBuilder};

/// Ten structurally identical disjoint cliques of five with uniform edge
/// weights, built directly as a projection so nothing bridges them.
fn ten_disjoint_cliques() -> EntityProjection {
    let clique_size = 5;
    let cliques = 10;
    let n = clique_size * cliques;

    let mut names = Vec::with_capacity(n);
    let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for clique in 0..cliques {
        for member in 0..clique_size {
            names.push(format!("Tribe{:02}Member{}", clique, member));
        }
        for a in 0..clique_size {
            for b in (a + 1)..clique_size {
                let (i, j) = (clique * clique_size + a, clique * clique_size + b);
                adj[i].push((j, 1.0));
                adj[j].push((i, 1.0));
            }
        }
    }
    let edge_count = cliques * clique_size * (clique_size - 1) / 2;
    EntityProjection {
        node_ids: (0..n as u32).collect(),
        names,
        adj,
        edge_count,
        total_weight: edge_count as f64,
    }
}

/// Two well-separated communities through the real builder: private type,
/// private move, and levels that never cross the boundary.
fn two_tribes() -> Vec<EntityRecord> {
    let mut records = Vec::new();
    for i in 0..5 {
        records.push(
            EntityRecord::new(format!("Fire{}", i), "Rookie")
                .with_types(&["Flame"])
                .with_moves(&["Fireball"]),
        );
    }
    for i in 0..5 {
        records.push(
            EntityRecord::new(format!("Aqua{}", i), "Champion")
                .with_types(&["Deep Sea"])
                .with_moves(&["Water Jet"]),
        );
    }
    records
}

#[test]
fn ten_disjoint_cliques_are_highly_stable() {
    let projection = ten_disjoint_cliques();
    let outcome = detect_communities(
        &projection,
        &LabelPropagation::default(),
        &AnalysisConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    let consensus = match &outcome {
        CommunityOutcome::Consensus(partition) => partition,
        CommunityOutcome::InsufficientStructure { .. } => panic!("expected a consensus"),
    };
    assert!((0.0..=1.0).contains(&consensus.stability));
    assert!(consensus.stability > 0.9);
    // ten equal disjoint cliques: modularity 0.9 exactly for the planted
    // partition, and the consensus should land on it
    assert!(consensus.modularity > 0.5);
    assert_eq!(consensus.community_count, 10);
    assert!(consensus.runs >= 10);
    for community in &consensus.communities {
        let tribe = &community[0][..7];
        assert!(community.iter().all(|name| name.starts_with(tribe)));
    }
}

#[test]
fn analysis_is_reproducible_run_to_run() {
    let snapshot = GraphBuilder::default().build(&two_tribes()).unwrap();
    let analyzer = NetworkAnalyzer::default();
    let first = analyzer.analyze(&snapshot).unwrap();
    let second = analyzer.analyze(&snapshot).unwrap();

    let a = first.communities.as_consensus().unwrap();
    let b = second.communities.as_consensus().unwrap();
    assert_eq!(a.membership, b.membership);
    assert_eq!(a.stability, b.stability);
    assert_eq!(first.centrality.degree, second.centrality.degree);
    assert_eq!(first.centrality.betweenness, second.centrality.betweenness);
}

#[test]
fn analyzer_recovers_the_two_tribes() {
    let snapshot = GraphBuilder::default().build(&two_tribes()).unwrap();
    let bundle = NetworkAnalyzer::default().analyze(&snapshot).unwrap();

    assert_eq!(bundle.metrics.components, 2);
    let consensus = bundle.communities.as_consensus().unwrap();
    assert_eq!(consensus.community_count, 2);
    assert!(consensus.stability > 0.9);
    assert!(consensus
        .communities
        .iter()
        .any(|c| c.iter().all(|name| name.starts_with("Fire"))));
}

#[test]
fn disconnected_graph_still_gets_finite_closeness() {
    let snapshot = GraphBuilder::default().build(&two_tribes()).unwrap();
    let bundle = NetworkAnalyzer::default().analyze(&snapshot).unwrap();
    assert!(bundle.metrics.components > 1);
    assert!(bundle
        .centrality
        .harmonic_closeness
        .iter()
        .all(|v| v.is_finite()));
    assert!(bundle
        .centrality
        .harmonic_closeness
        .iter()
        .any(|v| *v > 0.0));
}

#[test]
fn centrality_and_communities_arrive_together() {
    let snapshot = GraphBuilder::default().build(&two_tribes()).unwrap();
    let bundle = NetworkAnalyzer::default().analyze(&snapshot).unwrap();
    let consensus = bundle.communities.as_consensus().unwrap();

    assert_eq!(bundle.centrality.names.len(), consensus.membership.len());
    assert!(bundle.centrality.eigenvector.converged());
    assert!(bundle.centrality.pagerank.converged());
    // modularity and stability are reported side by side, never alone
    assert!(consensus.modularity.is_finite());
    assert!(consensus.stability.is_finite());
}

#[test]
fn pre_cancelled_analysis_returns_no_partial_bundle() {
    let snapshot = GraphBuilder::default().build(&two_tribes()).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let err = NetworkAnalyzer::default()
        .analyze_cancellable(&snapshot, &token)
        .unwrap_err();
    assert!(matches!(err, YggdrasilError::Cancelled));
}

#[test]
fn trivial_snapshot_reports_insufficient_structure() {
    let snapshot = GraphBuilder::default()
        .build(&[
            EntityRecord::new("Alone", "Rookie"),
            EntityRecord::new("Apart", "Mega"),
        ])
        .unwrap();
    let bundle = NetworkAnalyzer::new(AnalysisConfig::default())
        .analyze(&snapshot)
        .unwrap();
    assert!(matches!(
        bundle.communities,
        CommunityOutcome::InsufficientStructure { .. }
    ));
}

#[test]
fn bundle_serializes_for_the_export_collaborator() {
    let snapshot = GraphBuilder::default().build(&two_tribes()).unwrap();
    let bundle = NetworkAnalyzer::default().analyze(&snapshot).unwrap();
    let json = serde_json::to_string(&bundle).unwrap();
    assert!(json.contains("stability"));
    assert!(json.contains("harmonic_closeness"));
}
