//! Three-phase stochastic beam search (§4.J): grow outbound, wander through
//! an explore phase, then bias home and fall back to a bounded BFS closure
//! to actually complete the loop. Diversity is enforced by compass-sector
//! bucketing and Jaccard dedup over visited-edge sets.

use rustc_hash::FxHashSet;

use crate::geo::{bearing, haversine_distance};
use crate::model::{Coordinate, EdgeId, NodeId, SearchCandidate, SearchEdge, SearchGraph};
use crate::rng::SearchRng;

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub target_distance_m: f64,
    pub tolerance_fraction: f64,
    pub beam_width: usize,
    pub branch_factor: usize,
    pub max_routes: usize,
    pub seed: u64,
    pub closure_max_edges: usize,
    pub closure_max_cost_m: f64,
    pub jaccard_dedup_threshold: f64,
    pub outbound_fraction: f64,
    pub explore_fraction: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            target_distance_m: 10_000.0,
            tolerance_fraction: 0.15,
            beam_width: 24,
            branch_factor: 3,
            max_routes: 5,
            seed: 0,
            closure_max_edges: 40,
            closure_max_cost_m: 3_000.0,
            jaccard_dedup_threshold: 0.6,
            outbound_fraction: 0.4,
            explore_fraction: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Outbound,
    Explore,
    Return,
}

fn phase_for(distance_so_far: f64, params: &SearchParams) -> Phase {
    let outbound_end = params.target_distance_m * params.outbound_fraction;
    let explore_end = outbound_end + params.target_distance_m * params.explore_fraction;
    if distance_so_far < outbound_end {
        Phase::Outbound
    } else if distance_so_far < explore_end {
        Phase::Explore
    } else {
        Phase::Return
    }
}

fn within_tolerance(distance: f64, params: &SearchParams) -> bool {
    let delta = (distance - params.target_distance_m).abs();
    delta <= params.target_distance_m * params.tolerance_fraction
}

/// Edge selection weight: corridor/connector score, biased by phase. The
/// return phase rewards edges that shrink the straight-line distance back
/// to the start node; outbound/explore reward the edge's own quality.
fn selection_weight(
    graph: &SearchGraph,
    candidate: &SearchCandidate,
    edge: &SearchEdge,
    start_coord: Coordinate,
    phase: Phase,
) -> f64 {
    let quality = edge.score.max(0.01);
    match phase {
        Phase::Outbound | Phase::Explore => quality,
        Phase::Return => {
            let current_coord = graph.coordinate_of(&candidate.current_node_id);
            let target_coord = graph.coordinate_of(&edge.target_node_id);
            match (current_coord, target_coord) {
                (Some(cur), Some(next)) => {
                    let before = haversine_distance(cur, start_coord);
                    let after = haversine_distance(next, start_coord);
                    let progress = (before - after).max(0.0) + 1.0;
                    quality * progress
                }
                _ => quality,
            }
        }
    }
}

fn candidate_allowed_edges<'a>(graph: &'a SearchGraph, candidate: &SearchCandidate) -> Vec<&'a SearchEdge> {
    graph
        .outgoing(&candidate.current_node_id)
        .iter()
        .filter(|e| !candidate.visited_edges.contains(&e.graph_edge_id))
        .collect()
}

fn extend(candidate: &SearchCandidate, edge: &SearchEdge) -> SearchCandidate {
    let mut next = candidate.clone();
    next.edge_path.push(edge.graph_edge_id.clone());
    if !edge.corridor_id.is_empty() {
        next.corridor_path.push(edge.corridor_id.clone());
        next.corridor_distance += edge.length_meters;
        next.weighted_score_sum += edge.score * edge.length_meters;
    } else {
        next.connector_penalty_sum += 1.0 - edge.score;
    }
    next.node_path.push(edge.target_node_id.clone());
    next.current_node_id = edge.target_node_id.clone();
    next.distance_so_far += edge.length_meters;
    next.visited_edges.insert(edge.graph_edge_id.clone());
    next.last_edge_score = edge.score;
    next
}

fn jaccard(a: &FxHashSet<EdgeId>, b: &FxHashSet<EdgeId>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn fitness(candidate: &SearchCandidate) -> f64 {
    candidate.avg_corridor_score() - 0.05 * candidate.connector_penalty_sum
}

/// Bounded BFS from `from` toward `to`, used both as the fallback closure
/// once a candidate nears home and as the final "snap shut" when a
/// candidate is close enough to have exhausted its distance budget.
fn bfs_closure(
    graph: &SearchGraph,
    from: &NodeId,
    to: &NodeId,
    max_edges: usize,
    max_cost_m: f64,
) -> Option<Vec<SearchEdge>> {
    use std::collections::VecDeque;

    if from == to {
        return Some(Vec::new());
    }

    #[derive(Clone)]
    struct Visit {
        edges: Vec<SearchEdge>,
        cost: f64,
    }

    let mut queue: VecDeque<(NodeId, Visit)> = VecDeque::new();
    queue.push_back((from.clone(), Visit { edges: Vec::new(), cost: 0.0 }));
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    visited.insert(from.clone());

    while let Some((node, visit)) = queue.pop_front() {
        if visit.edges.len() >= max_edges {
            continue;
        }
        for edge in graph.outgoing(&node) {
            let new_cost = visit.cost + edge.length_meters;
            if new_cost > max_cost_m {
                continue;
            }
            if &edge.target_node_id == to {
                let mut edges = visit.edges.clone();
                edges.push(edge.clone());
                return Some(edges);
            }
            if visited.contains(&edge.target_node_id) {
                continue;
            }
            visited.insert(edge.target_node_id.clone());
            let mut edges = visit.edges.clone();
            edges.push(edge.clone());
            queue.push_back((edge.target_node_id.clone(), Visit { edges, cost: new_cost }));
        }
    }

    None
}

fn close_with_bfs(graph: &SearchGraph, candidate: &SearchCandidate, start_node: &NodeId, params: &SearchParams) -> Option<SearchCandidate> {
    let remaining_budget = (params.target_distance_m * (1.0 + params.tolerance_fraction) - candidate.distance_so_far).max(0.0);
    let closure_path = bfs_closure(
        graph,
        &candidate.current_node_id,
        start_node,
        params.closure_max_edges,
        params.closure_max_cost_m.min(remaining_budget.max(1.0)),
    )?;

    let mut closed = candidate.clone();
    for edge in &closure_path {
        closed = extend(&closed, edge);
    }
    if within_tolerance(closed.distance_so_far, params) {
        Some(closed)
    } else {
        None
    }
}

/// Runs the beam search from `start_node` and returns up to `max_routes`
/// diverse, completed loop candidates.
pub fn generate_loops(graph: &SearchGraph, start_node: NodeId, params: &SearchParams) -> Vec<SearchCandidate> {
    let Some(start_coord) = graph.coordinate_of(&start_node) else {
        return Vec::new();
    };

    let mut rng = SearchRng::from_seed(params.seed);
    let mut beam = vec![SearchCandidate::start(start_node.clone())];
    let mut completed: Vec<SearchCandidate> = Vec::new();

    let max_steps = 400;
    let mut step = 0;

    while step < max_steps && !beam.is_empty() && completed.len() < params.max_routes * 6 {
        step += 1;
        let mut pool: Vec<SearchCandidate> = Vec::new();

        for candidate in &beam {
            if candidate.distance_so_far >= params.target_distance_m * (1.0 - params.tolerance_fraction)
                && candidate.current_node_id == start_node
                && within_tolerance(candidate.distance_so_far, params)
            {
                completed.push(candidate.clone());
                continue;
            }

            let phase = phase_for(candidate.distance_so_far, params);

            if phase == Phase::Return {
                if let Some(closed) = close_with_bfs(graph, candidate, &start_node, params) {
                    completed.push(closed);
                    continue;
                }
            }

            let allowed = candidate_allowed_edges(graph, candidate);
            if allowed.is_empty() {
                continue;
            }

            let weights: Vec<f64> = allowed
                .iter()
                .map(|e| selection_weight(graph, candidate, e, start_coord, phase))
                .collect();

            let mut picked: FxHashSet<usize> = FxHashSet::default();
            for _ in 0..params.branch_factor.min(allowed.len()) {
                if let Some(idx) = rng.weighted_pick(&weights) {
                    if picked.insert(idx) {
                        pool.push(extend(candidate, allowed[idx]));
                    }
                }
            }
        }

        if pool.is_empty() {
            break;
        }

        pool.sort_by(|a, b| fitness(b).partial_cmp(&fitness(a)).unwrap());
        pool.truncate(params.beam_width);
        beam = pool;
    }

    finalize_routes(completed, start_coord, graph, params)
}

fn compass_sector(graph: &SearchGraph, candidate: &SearchCandidate, start_coord: Coordinate) -> u8 {
    let early_node = candidate
        .node_path
        .get(candidate.node_path.len().min(3).saturating_sub(1))
        .unwrap_or(&candidate.current_node_id);
    match graph.coordinate_of(early_node) {
        Some(coord) => ((bearing(start_coord, coord) / 45.0) as u8) % 8,
        None => 0,
    }
}

/// Deduplicates near-identical routes (Jaccard over visited edges) and
/// then selects up to `max_routes`, reserving slots across compass
/// sectors so the final set doesn't all head the same direction.
fn finalize_routes(
    mut completed: Vec<SearchCandidate>,
    start_coord: Coordinate,
    graph: &SearchGraph,
    params: &SearchParams,
) -> Vec<SearchCandidate> {
    completed.sort_by(|a, b| fitness(b).partial_cmp(&fitness(a)).unwrap());

    let mut kept: Vec<SearchCandidate> = Vec::new();
    for candidate in completed {
        let is_dup = kept
            .iter()
            .any(|k| jaccard(&k.visited_edges, &candidate.visited_edges) > params.jaccard_dedup_threshold);
        if !is_dup {
            kept.push(candidate);
        }
    }

    let mut by_sector: std::collections::HashMap<u8, Vec<SearchCandidate>> = std::collections::HashMap::new();
    for candidate in kept {
        let sector = compass_sector(graph, &candidate, start_coord);
        by_sector.entry(sector).or_default().push(candidate);
    }

    let mut result = Vec::new();
    let mut sectors: Vec<u8> = by_sector.keys().copied().collect();
    sectors.sort_unstable();
    'outer: loop {
        let mut progressed = false;
        for sector in &sectors {
            if let Some(bucket) = by_sector.get_mut(sector) {
                if !bucket.is_empty() {
                    result.push(bucket.remove(0));
                    progressed = true;
                    if result.len() >= params.max_routes {
                        break 'outer;
                    }
                }
            }
        }
        if !progressed {
            break;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SearchEdgeKind};

    fn add_edge(graph: &mut SearchGraph, from: &str, to: &str, from_coord: Coordinate, to_coord: Coordinate, length: f64, score: f64) {
        graph.node_coordinates.entry(from.to_string()).or_insert(from_coord);
        graph.node_coordinates.entry(to.to_string()).or_insert(to_coord);
        graph.adjacency.entry(from.to_string()).or_default().push(SearchEdge {
            graph_edge_id: format!("{from}-{to}"),
            corridor_id: format!("corridor:{from}-{to}"),
            kind: SearchEdgeKind::Corridor,
            target_node_id: to.to_string(),
            length_meters: length,
            score,
        });
    }

    /// A small square loop, each side ~1km, so a loop of ~4km is achievable.
    fn square_graph() -> SearchGraph {
        let mut graph = SearchGraph::new();
        let a = Coordinate::new(45.000, 0.000);
        let b = Coordinate::new(45.000, 0.013);
        let c = Coordinate::new(45.009, 0.013);
        let d = Coordinate::new(45.009, 0.000);
        add_edge(&mut graph, "a", "b", a, b, 1000.0, 0.8);
        add_edge(&mut graph, "b", "a", b, a, 1000.0, 0.8);
        add_edge(&mut graph, "b", "c", b, c, 1000.0, 0.8);
        add_edge(&mut graph, "c", "b", c, b, 1000.0, 0.8);
        add_edge(&mut graph, "c", "d", c, d, 1000.0, 0.8);
        add_edge(&mut graph, "d", "c", d, c, 1000.0, 0.8);
        add_edge(&mut graph, "d", "a", d, a, 1000.0, 0.8);
        add_edge(&mut graph, "a", "d", a, d, 1000.0, 0.8);
        graph
    }

    #[test]
    fn finds_at_least_one_loop_back_to_the_start() {
        let graph = square_graph();
        let params = SearchParams {
            target_distance_m: 4000.0,
            tolerance_fraction: 0.3,
            max_routes: 3,
            seed: 1,
            ..SearchParams::default()
        };
        let routes = generate_loops(&graph, "a".to_string(), &params);
        assert!(!routes.is_empty());
        for route in &routes {
            assert_eq!(route.current_node_id, "a");
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let graph = square_graph();
        let params = SearchParams {
            target_distance_m: 4000.0,
            tolerance_fraction: 0.3,
            max_routes: 3,
            seed: 99,
            ..SearchParams::default()
        };
        let a = generate_loops(&graph, "a".to_string(), &params);
        let b = generate_loops(&graph, "a".to_string(), &params);
        let a_paths: Vec<Vec<String>> = a.iter().map(|c| c.edge_path.clone()).collect();
        let b_paths: Vec<Vec<String>> = b.iter().map(|c| c.edge_path.clone()).collect();
        assert_eq!(a_paths, b_paths);
    }
}
