//! Chain builder (§4.C): greedy walk producing maximal compatible edge
//! chains, bidirectional dedup, and 2-core dead-end pruning to a fixpoint.

use std::collections::VecDeque;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::compat::{compatibility, CompatibilityOptions};
use crate::geo::{bearing, bearing_diff};
use crate::model::{EdgeChain, EdgeId, Graph, GraphEdge, NodeId, RoadClass};

#[derive(Debug, Clone)]
pub struct ChainBuildOptions {
    pub max_angle_change_deg: f64,
    pub compatibility: CompatibilityOptions,
}

impl Default for ChainBuildOptions {
    fn default() -> Self {
        Self {
            max_angle_change_deg: 45.0,
            compatibility: CompatibilityOptions::default(),
        }
    }
}

const MIN_GROWTH_COMPATIBILITY: f64 = 0.5;

fn exit_bearing(edge: &GraphEdge) -> f64 {
    let n = edge.geometry.len();
    bearing(edge.geometry[n - 2], edge.geometry[n - 1])
}

fn entry_bearing(edge: &GraphEdge) -> f64 {
    bearing(edge.geometry[0], edge.geometry[1])
}

/// Greedy walk over every edge, producing one chain per unvisited edge (or
/// bidirectional pair). Deterministic given the graph's edge insertion order.
pub fn build_chains(graph: &Graph, opts: &ChainBuildOptions) -> Vec<EdgeChain> {
    let mut visited: FxHashSet<EdgeId> = FxHashSet::default();
    let mut chains = Vec::new();

    for edge_id in graph.edges.keys() {
        if visited.contains(edge_id) {
            continue;
        }
        let chain_edges = grow_chain(graph, edge_id, &mut visited, opts);
        chains.push(build_edge_chain(graph, chain_edges));
    }

    chains
}

fn mark_visited(graph: &Graph, edge_id: &str, visited: &mut FxHashSet<EdgeId>) {
    visited.insert(edge_id.to_string());
    if let Some(counterpart) = graph.edges.get(edge_id).and_then(|e| e.counterpart_id()) {
        visited.insert(counterpart);
    }
}

fn grow_chain(
    graph: &Graph,
    seed: &str,
    visited: &mut FxHashSet<EdgeId>,
    opts: &ChainBuildOptions,
) -> VecDeque<EdgeId> {
    let mut chain: VecDeque<EdgeId> = VecDeque::new();
    chain.push_back(seed.to_string());
    mark_visited(graph, seed, visited);

    // Forward growth.
    loop {
        let tail = graph.edges.get(chain.back().unwrap()).unwrap();
        match best_forward_candidate(graph, tail, visited, opts) {
            Some(next_id) => {
                mark_visited(graph, &next_id, visited);
                chain.push_back(next_id);
            }
            None => break,
        }
    }

    // Backward growth.
    loop {
        let head = graph.edges.get(chain.front().unwrap()).unwrap();
        match best_backward_candidate(graph, head, visited, opts) {
            Some(prev_id) => {
                mark_visited(graph, &prev_id, visited);
                chain.push_front(prev_id);
            }
            None => break,
        }
    }

    chain
}

fn best_forward_candidate(
    graph: &Graph,
    tail: &GraphEdge,
    visited: &FxHashSet<EdgeId>,
    opts: &ChainBuildOptions,
) -> Option<EdgeId> {
    let tail_exit = exit_bearing(tail);
    let mut best: Option<(EdgeId, f64)> = None;

    for cand_id in graph.outgoing_edges(&tail.to_node_id) {
        if visited.contains(cand_id) {
            continue;
        }
        let candidate = graph.edges.get(cand_id).unwrap();
        if bearing_diff(tail_exit, entry_bearing(candidate)) > opts.max_angle_change_deg {
            continue;
        }
        let score = compatibility(&tail.attributes, &candidate.attributes, &opts.compatibility);
        if score < MIN_GROWTH_COMPATIBILITY {
            continue;
        }
        if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
            best = Some((cand_id.clone(), score));
        }
    }

    best.map(|(id, _)| id)
}

fn best_backward_candidate(
    graph: &Graph,
    head: &GraphEdge,
    visited: &FxHashSet<EdgeId>,
    opts: &ChainBuildOptions,
) -> Option<EdgeId> {
    let head_entry = entry_bearing(head);
    let mut best: Option<(EdgeId, f64)> = None;

    for cand_id in graph.incoming_edges(&head.from_node_id) {
        if visited.contains(cand_id) {
            continue;
        }
        let candidate = graph.edges.get(cand_id).unwrap();
        if bearing_diff(exit_bearing(candidate), head_entry) > opts.max_angle_change_deg {
            continue;
        }
        let score = compatibility(&candidate.attributes, &head.attributes, &opts.compatibility);
        if score < MIN_GROWTH_COMPATIBILITY {
            continue;
        }
        if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
            best = Some((cand_id.clone(), score));
        }
    }

    best.map(|(id, _)| id)
}

fn build_edge_chain(graph: &Graph, edge_ids: VecDeque<EdgeId>) -> EdgeChain {
    let edge_ids: Vec<EdgeId> = edge_ids.into_iter().collect();
    let first = graph.edges.get(&edge_ids[0]).unwrap();
    let last = graph.edges.get(edge_ids.last().unwrap()).unwrap();
    let total_length_meters = edge_ids
        .iter()
        .map(|id| graph.edges.get(id).unwrap().attributes.length_meters)
        .sum();
    EdgeChain {
        edge_ids,
        start_node_id: first.from_node_id.clone(),
        end_node_id: last.to_node_id.clone(),
        total_length_meters,
        is_destination: false,
    }
}

/// Minimal per-chain stats needed for the destination-rescue gate (§4.C);
/// a fuller length-weighted aggregate lives in `aggregate::aggregate_attributes`.
struct DestinationStats {
    length_meters: f64,
    named: bool,
    elevation_gain: f64,
    predominant_road_class: RoadClass,
}

fn destination_stats(graph: &Graph, edge_ids: &[EdgeId]) -> DestinationStats {
    let mut length_by_class: IndexMap<RoadClass, f64> = IndexMap::new();
    let mut length_meters = 0.0;
    let mut named = false;
    let mut elevation_gain = 0.0;

    for id in edge_ids {
        let edge = graph.edges.get(id).unwrap();
        let len = edge.attributes.length_meters;
        length_meters += len;
        if edge.attributes.name.as_ref().is_some_and(|n| !n.is_empty()) {
            named = true;
        }
        elevation_gain += edge.attributes.elevation_gain.unwrap_or(0.0);
        *length_by_class.entry(edge.attributes.road_class).or_insert(0.0) += len;
    }

    let predominant_road_class = length_by_class
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(rc, _)| rc)
        .unwrap_or(RoadClass::Unclassified);

    DestinationStats {
        length_meters,
        named,
        elevation_gain,
        predominant_road_class,
    }
}

fn qualifies_as_destination(stats: &DestinationStats) -> bool {
    use RoadClass::*;

    if stats.length_meters < 1000.0 {
        return false;
    }
    if matches!(stats.predominant_road_class, Service | Footway) {
        return false;
    }

    let is_named_or_hilly_or_offroad = stats.named
        || stats.elevation_gain >= 50.0
        || (matches!(stats.predominant_road_class, Cycleway | Path | Track) && stats.length_meters >= 800.0);

    is_named_or_hilly_or_offroad
}

/// Deduped undirected adjacency over the chains' edges, excluding road class
/// `service` so parking-lot loops can't block pruning of adjacent dead-ends
/// (§4.C). A node pair contributes at most one neighbor link even if both
/// directed counterparts (`:f`/`:r`) appear among the chains.
fn build_neighbor_adjacency(graph: &Graph, chains: &[EdgeChain]) -> IndexMap<NodeId, Vec<NodeId>> {
    let mut pairs: indexmap::IndexSet<(NodeId, NodeId)> = indexmap::IndexSet::new();
    for chain in chains {
        for edge_id in &chain.edge_ids {
            let edge = graph.edges.get(edge_id).unwrap();
            if edge.attributes.road_class == RoadClass::Service {
                continue;
            }
            let (a, b) = (edge.from_node_id.clone(), edge.to_node_id.clone());
            let key = if a <= b { (a, b) } else { (b, a) };
            pairs.insert(key);
        }
    }

    let mut adjacency: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();
    for (a, b) in &pairs {
        adjacency.entry(a.clone()).or_default().push(b.clone());
        adjacency.entry(b.clone()).or_default().push(a.clone());
    }
    adjacency
}

/// Queue-based 2-core extraction: nodes of degree ≤ 1 are peeled away,
/// decrementing their neighbors, until stable. Returns the residual
/// ("pruned") degree per node; nodes absent from the map have degree 0.
fn two_core_prune(graph: &Graph, chains: &[EdgeChain]) -> IndexMap<NodeId, u32> {
    let adjacency = build_neighbor_adjacency(graph, chains);

    let mut degree: IndexMap<NodeId, u32> = adjacency
        .iter()
        .map(|(node, neighbors)| (node.clone(), neighbors.len() as u32))
        .collect();
    let mut queue: VecDeque<NodeId> = degree
        .iter()
        .filter(|(_, d)| **d <= 1)
        .map(|(n, _)| n.clone())
        .collect();
    let mut removed: FxHashSet<NodeId> = FxHashSet::default();

    while let Some(node) = queue.pop_front() {
        if removed.contains(&node) {
            continue;
        }
        removed.insert(node.clone());
        degree.insert(node.clone(), 0);
        if let Some(neighbors) = adjacency.get(&node) {
            for neighbor in neighbors.clone() {
                if removed.contains(&neighbor) {
                    continue;
                }
                let d = degree.entry(neighbor.clone()).or_insert(0);
                if *d > 0 {
                    *d -= 1;
                }
                if *d <= 1 {
                    queue.push_back(neighbor);
                }
            }
        }
    }

    degree
}

fn pruned_degree(degree: &IndexMap<NodeId, u32>, node: &str) -> u32 {
    degree.get(node).copied().unwrap_or(0)
}

/// Trims dead-end edges off both ends of every chain, rescuing destination
/// chains that would otherwise be fully consumed, and iterates the whole
/// degree/trim pass to a fixpoint (§4.C).
pub fn prune_to_fixpoint(graph: &Graph, mut chains: Vec<EdgeChain>) -> Vec<EdgeChain> {
    loop {
        let degree = two_core_prune(graph, &chains);
        let mut changed = false;
        let mut next_chains = Vec::with_capacity(chains.len());

        for chain in chains {
            if chain.is_destination {
                // Already rescued in an earlier pass; never re-trimmed.
                next_chains.push(chain);
                continue;
            }

            let original_edges = chain.edge_ids.clone();
            let mut edges: VecDeque<EdgeId> = chain.edge_ids.into_iter().collect();

            while let Some(id) = edges.front() {
                let e = graph.edges.get(id).unwrap();
                if pruned_degree(&degree, &e.from_node_id) <= 1 {
                    edges.pop_front();
                    changed = true;
                } else {
                    break;
                }
            }
            while let Some(id) = edges.back() {
                let e = graph.edges.get(id).unwrap();
                if pruned_degree(&degree, &e.to_node_id) <= 1 {
                    edges.pop_back();
                    changed = true;
                } else {
                    break;
                }
            }

            if edges.is_empty() {
                let stats = destination_stats(graph, &original_edges);
                if qualifies_as_destination(&stats) {
                    let mut rescued = build_edge_chain(graph, original_edges.into_iter().collect());
                    rescued.is_destination = true;
                    next_chains.push(rescued);
                    // Rescuing after trimming would have removed edges is itself
                    // a change, since the chain set differs from a naive trim.
                    changed = true;
                }
                continue;
            }

            next_chains.push(build_edge_chain(graph, edges));
        }

        chains = next_chains;
        if !changed {
            return chains;
        }
    }
}
