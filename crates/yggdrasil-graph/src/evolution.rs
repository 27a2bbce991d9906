use crate::snapshot::GraphSnapshot;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use yggdrasil_core::{CancellationToken, ChainConfig, EdgeKind, NodeId, Result, Stage, YggdrasilError};

/// One enumerated forward path through the evolution sub-graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionPath {
    /// Ordered entity names from the start onwards.
    pub nodes: Vec<String>,
    pub length: usize,
    /// Nodes along the path with more than one forward continuation.
    pub branch_count: usize,
    pub type_transitions: Vec<TypeTransition>,
    /// Path runs into a cyclic evolution group (or a back edge) and was
    /// stopped at its boundary.
    pub cyclic: bool,
    /// Path hit the stage-ordering depth bound while continuations
    /// remained; emitted truncated and flagged, never dropped.
    pub depth_exceeded: bool,
}

/// Type sets at two consecutive steps of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTransition {
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// All paths reachable from one chain start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionChain {
    pub root: String,
    /// Start was selected for being Baby-level even though it has
    /// incoming evolution edges.
    pub baby_start: bool,
    /// Entity with no evolution edges at all; yields exactly one
    /// length-1 path and stays out of root statistics.
    pub isolated: bool,
    pub paths: Vec<EvolutionPath>,
    /// Entities reached from this start via more than one distinct path.
    pub convergence_points: Vec<String>,
}

/// Non-trivial strongly connected component of the evolution sub-graph
/// (fusion/DNA evolution loops). Excluded from linear path enumeration but
/// fully reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclicGroup {
    pub members: Vec<String>,
    pub internal_edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionChainSet {
    pub chains: Vec<EvolutionChain>,
    pub cyclic_groups: Vec<CyclicGroup>,
    /// Starts with no incoming evolution edge and at least one outgoing.
    pub root_count: usize,
    pub isolated_count: usize,
}

/// Forward-oriented view of the evolution sub-graph: `EVOLVES_FROM` edges
/// reversed, so edges point parent -> child in evolution order.
struct ForwardGraph {
    ids: Vec<NodeId>,
    names: Vec<String>,
    types: Vec<Vec<String>>,
    stages: Vec<Option<Stage>>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
    /// dense index of nodes sitting in a non-trivial SCC
    in_cycle: Vec<bool>,
}

impl ForwardGraph {
    fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let ids: Vec<NodeId> = snapshot.entity_ids().collect();
        let mut dense: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (i, &id) in ids.iter().enumerate() {
            dense.insert(id, i);
        }

        let n = ids.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut parents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in snapshot.edges() {
            if edge.kind != EdgeKind::EvolvesFrom {
                continue;
            }
            // stored child -> parent; forward is parent -> child
            let (child, parent) = (dense[&edge.from], dense[&edge.to]);
            children[parent].push(child);
            parents[child].push(parent);
        }
        for list in children.iter_mut().chain(parents.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        let mut names = Vec::with_capacity(n);
        let mut types = Vec::with_capacity(n);
        let mut stages = Vec::with_capacity(n);
        for &id in &ids {
            let node = snapshot.node(id);
            names.push(node.name.clone());
            let entity = node.entity.as_ref();
            types.push(entity.map(|e| e.types.clone()).unwrap_or_default());
            stages.push(entity.and_then(|e| e.stage));
        }

        Self {
            ids,
            names,
            types,
            stages,
            children,
            parents,
            in_cycle: vec![false; n],
        }
    }

    fn node_count(&self) -> usize {
        self.ids.len()
    }
}

/// Walks the directed evolution sub-graph and produces chain, branch and
/// cycle metadata for every root (or Baby-level start).
pub struct ChainExtractor {
    config: ChainConfig,
}

impl Default for ChainExtractor {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl ChainExtractor {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, snapshot: &GraphSnapshot) -> Result<EvolutionChainSet> {
        self.extract_cancellable(snapshot, &CancellationToken::new())
    }

    /// Extraction is independent per start; the token is polled before
    /// each start's walk, and a cancelled extraction returns no result
    /// rather than a partial chain set.
    pub fn extract_cancellable(
        &self,
        snapshot: &GraphSnapshot,
        token: &CancellationToken,
    ) -> Result<EvolutionChainSet> {
        let mut graph = ForwardGraph::from_snapshot(snapshot);

        // Cycle handling comes first: any non-trivial SCC is excluded from
        // simple path enumeration but reported with its internal edges.
        let components = tarjan_scc(&graph.children);
        let mut cyclic_groups = Vec::new();
        for component in &components {
            if component.len() < 2 {
                continue;
            }
            for &i in component {
                graph.in_cycle[i] = true;
            }
            let member_set: FxHashSet<usize> = component.iter().copied().collect();
            let mut members: Vec<String> =
                component.iter().map(|&i| graph.names[i].clone()).collect();
            members.sort_unstable();
            let mut internal_edges = Vec::new();
            for &i in component {
                for &c in &graph.children[i] {
                    if member_set.contains(&c) {
                        internal_edges.push((graph.names[i].clone(), graph.names[c].clone()));
                    }
                }
            }
            internal_edges.sort_unstable();
            cyclic_groups.push(CyclicGroup {
                members,
                internal_edges,
            });
        }
        cyclic_groups.sort_unstable_by(|a, b| a.members.cmp(&b.members));
        if !cyclic_groups.is_empty() {
            debug!(
                "{} cyclic evolution groups excluded from path enumeration",
                cyclic_groups.len()
            );
        }

        // Start set: every true root, plus explicitly Baby-level entities
        // that sit mid-graph. Cycle members are never starts.
        let mut starts: Vec<(usize, bool)> = Vec::new();
        for i in 0..graph.node_count() {
            if graph.in_cycle[i] {
                continue;
            }
            if graph.parents[i].is_empty() {
                starts.push((i, false));
            } else if graph.stages[i] == Some(Stage::BabyI) {
                starts.push((i, true));
            }
        }

        let graph = &graph;
        let chains: Vec<Option<EvolutionChain>> = starts
            .par_iter()
            .map(|&(start, baby_start)| {
                if token.is_cancelled() {
                    return None;
                }
                Some(self.walk_start(graph, start, baby_start))
            })
            .collect();

        if token.is_cancelled() {
            return Err(YggdrasilError::Cancelled);
        }
        let mut chains: Vec<EvolutionChain> = chains.into_iter().flatten().collect();
        chains.sort_unstable_by(|a, b| a.root.cmp(&b.root));

        let root_count = chains
            .iter()
            .filter(|c| !c.isolated && !c.baby_start)
            .count();
        let isolated_count = chains.iter().filter(|c| c.isolated).count();
        info!(
            "extracted {} chains ({} roots, {} isolated, {} cyclic groups)",
            chains.len(),
            root_count,
            isolated_count,
            cyclic_groups.len()
        );

        Ok(EvolutionChainSet {
            chains,
            cyclic_groups,
            root_count,
            isolated_count,
        })
    }

    fn walk_start(&self, graph: &ForwardGraph, start: usize, baby_start: bool) -> EvolutionChain {
        let isolated = graph.parents[start].is_empty() && graph.children[start].is_empty();

        // BFS layering establishes reachability and flags convergence: a
        // reachable node with two or more reachable parents was arrived at
        // along distinct paths.
        let mut reachable: FxHashSet<usize> = FxHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        reachable.insert(start);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for &child in &graph.children[current] {
                if graph.in_cycle[child] {
                    continue;
                }
                if reachable.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        let mut convergence_points: Vec<String> = Vec::new();
        for &i in &reachable {
            if i == start {
                continue;
            }
            let reachable_parents = graph.parents[i]
                .iter()
                .filter(|p| reachable.contains(p))
                .count();
            if reachable_parents >= 2 {
                convergence_points.push(graph.names[i].clone());
            }
        }
        convergence_points.sort_unstable();

        let mut paths = Vec::new();
        let mut current = Vec::new();
        self.enumerate(graph, start, &mut current, &mut paths);

        EvolutionChain {
            root: graph.names[start].clone(),
            baby_start,
            isolated,
            paths,
            convergence_points,
        }
    }

    /// DFS path enumeration, bounded at the stage-count depth. A path
    /// stops before entering a cyclic group or revisiting itself, and the
    /// blocked branch is emitted as its own cyclic-flagged path.
    fn enumerate(
        &self,
        graph: &ForwardGraph,
        node: usize,
        current: &mut Vec<usize>,
        paths: &mut Vec<EvolutionPath>,
    ) {
        current.push(node);

        let mut open: Vec<usize> = Vec::new();
        let mut blocked = false;
        for &child in &graph.children[node] {
            if graph.in_cycle[child] || current.contains(&child) {
                blocked = true;
            } else {
                open.push(child);
            }
        }

        if current.len() >= self.config.max_depth {
            paths.push(self.finish_path(graph, current, blocked, !open.is_empty()));
        } else {
            if open.is_empty() || blocked {
                paths.push(self.finish_path(graph, current, blocked, false));
            }
            for child in open {
                self.enumerate(graph, child, current, paths);
            }
        }

        current.pop();
    }

    fn finish_path(
        &self,
        graph: &ForwardGraph,
        nodes: &[usize],
        cyclic: bool,
        depth_exceeded: bool,
    ) -> EvolutionPath {
        let branch_count = nodes
            .iter()
            .filter(|&&i| graph.children[i].len() > 1)
            .count();
        let type_transitions = nodes
            .windows(2)
            .map(|pair| TypeTransition {
                from: graph.types[pair[0]].clone(),
                to: graph.types[pair[1]].clone(),
            })
            .collect();
        EvolutionPath {
            nodes: nodes.iter().map(|&i| graph.names[i].clone()).collect(),
            length: nodes.len(),
            branch_count,
            type_transitions,
            cyclic,
            depth_exceeded,
        }
    }
}

/// Tarjan's strongly-connected-components over a dense adjacency list.
fn tarjan_scc(children: &[Vec<usize>]) -> Vec<Vec<usize>> {
    struct State<'a> {
        children: &'a [Vec<usize>],
        index_counter: usize,
        stack: Vec<usize>,
        indices: Vec<Option<usize>>,
        lowlinks: Vec<usize>,
        on_stack: Vec<bool>,
        components: Vec<Vec<usize>>,
    }

    fn visit(state: &mut State<'_>, node: usize) {
        state.indices[node] = Some(state.index_counter);
        state.lowlinks[node] = state.index_counter;
        state.index_counter += 1;
        state.stack.push(node);
        state.on_stack[node] = true;

        let kids = state.children[node].clone();
        for child in kids {
            if state.indices[child].is_none() {
                visit(state, child);
                state.lowlinks[node] = state.lowlinks[node].min(state.lowlinks[child]);
            } else if state.on_stack[child] {
                let child_index = state.indices[child].unwrap_or(usize::MAX);
                state.lowlinks[node] = state.lowlinks[node].min(child_index);
            }
        }

        if state.lowlinks[node] == state.indices[node].unwrap_or(usize::MAX) {
            let mut component = Vec::new();
            loop {
                let w = match state.stack.pop() {
                    Some(w) => w,
                    None => break,
                };
                state.on_stack[w] = false;
                component.push(w);
                if w == node {
                    break;
                }
            }
            state.components.push(component);
        }
    }

    let n = children.len();
    let mut state = State {
        children,
        index_counter: 0,
        stack: Vec::new(),
        indices: vec![None; n],
        lowlinks: vec![0; n],
        on_stack: vec![false; n],
        components: Vec::new(),
    };
    for node in 0..n {
        if state.indices[node].is_none() {
            visit(&mut state, node);
        }
    }
    state.components
}
