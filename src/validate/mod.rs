//! Invariant checks over the pipeline's own output (§8). These are not
//! input validation — malformed OSM data is tolerated and skipped during
//! ingest (§7) — they catch the core algorithms contradicting their own
//! contract, which is always a fatal, structured error (`InvariantError`).

use crate::error::InvariantError;
use crate::model::{CorridorNetwork, EdgeChain, Graph, SearchCandidate};

/// Every edge in every chain must resolve in the graph, and consecutive
/// edges must share a node (§8: chain continuity).
pub fn check_chain_continuity(graph: &Graph, chain: &EdgeChain) -> Result<(), InvariantError> {
    let edges: Vec<_> = chain
        .edge_ids
        .iter()
        .map(|id| {
            graph.edges.get(id).ok_or_else(|| InvariantError::DanglingEdge {
                chain: chain_label(chain),
                edge: id.clone(),
            })
        })
        .collect::<Result<_, _>>()?;

    for window in edges.windows(2) {
        if window[0].to_node_id != window[1].from_node_id {
            return Err(InvariantError::BrokenChain {
                chain: chain_label(chain),
                prev: window[0].id.clone(),
                prev_to: window[0].to_node_id.clone(),
                next: window[1].id.clone(),
                next_from: window[1].from_node_id.clone(),
            });
        }
    }
    Ok(())
}

/// Every non-excluded directed edge must appear in exactly one chain,
/// counterpart dedup accounted for (§8: chain coverage).
pub fn check_chain_coverage(graph: &Graph, chains: &[EdgeChain], excluded: &[String]) -> Result<(), InvariantError> {
    use std::collections::HashSet;

    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    let mut covered: HashSet<&str> = HashSet::new();
    for chain in chains {
        for id in &chain.edge_ids {
            covered.insert(id.as_str());
        }
    }

    for id in graph.edges.keys() {
        if excluded.contains(id.as_str()) {
            continue;
        }
        let edge = &graph.edges[id];
        let counterpart = edge.counterpart_id();
        let counterpart_covered = counterpart.as_deref().map(|c| covered.contains(c)).unwrap_or(false);
        if !covered.contains(id.as_str()) && !counterpart_covered {
            return Err(InvariantError::DanglingEdge { chain: "<uncovered>".to_string(), edge: id.clone() });
        }
    }
    Ok(())
}

/// Adjacency must be symmetric: `b` lists `a` iff `a` lists `b` (§8).
pub fn check_adjacency_symmetry(network: &CorridorNetwork) -> Result<(), InvariantError> {
    for (a, neighbors) in &network.adjacency {
        for b in neighbors {
            let back = network.adjacency.get(b).map(|v| v.contains(a)).unwrap_or(false);
            if !back {
                return Err(InvariantError::AsymmetricAdjacency { a: a.clone(), b: b.clone() });
            }
        }
    }
    Ok(())
}

/// Every sub-score and overall score must be in [0, 1] (§8: score clamping).
pub fn check_score_clamping(network: &CorridorNetwork) -> Result<(), InvariantError> {
    for corridor in network.corridors.values() {
        for (activity, breakdown) in &corridor.scores {
            let fields = [
                ("overall", breakdown.overall),
                ("flow", breakdown.flow),
                ("safety", breakdown.safety),
                ("surface", breakdown.surface),
                ("character", breakdown.character),
                ("scenic", breakdown.scenic),
                ("elevation", breakdown.elevation),
            ];
            for (name, value) in fields {
                if !(0.0..=1.0).contains(&value) {
                    return Err(InvariantError::ScoreOutOfRange {
                        what: format!("{}.{:?}.{}", corridor.id, activity, name),
                        value,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Every surviving connector must bridge at least two distinct corridors
/// (§8: connector sanitization).
pub fn check_connector_sanitization(network: &CorridorNetwork) -> Result<(), InvariantError> {
    use std::collections::HashSet;

    for connector in network.connectors.values() {
        let distinct: HashSet<&str> = connector.corridor_ids.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            return Err(InvariantError::AsymmetricAdjacency {
                a: connector.id.clone(),
                b: format!("only {} distinct adjacent corridor(s)", distinct.len()),
            });
        }
    }
    Ok(())
}

/// The number of edges a candidate has visited outside the home zone must
/// equal the size of its visited-edge set (§8: search no-revisit). Since
/// `visited_edges` is itself a set, this holds iff no edge id was pushed
/// into `edge_path` twice.
pub fn check_no_revisit(candidate: &SearchCandidate) -> Result<(), InvariantError> {
    use std::collections::HashSet;

    let unique: HashSet<&str> = candidate.edge_path.iter().map(String::as_str).collect();
    if unique.len() != candidate.edge_path.len() {
        return Err(InvariantError::BrokenChain {
            chain: "search-candidate".to_string(),
            prev: "edge_path".to_string(),
            prev_to: unique.len().to_string(),
            next: "visited_edges".to_string(),
            next_from: candidate.edge_path.len().to_string(),
        });
    }
    Ok(())
}

/// Runs every structural check over a freshly assembled network. Intended
/// to run once after `buildCorridors`, not on every search. `pruned_edges`
/// lists edges the two-core prune dropped entirely (§4.C dead-end spurs);
/// those are expected to be uncovered and must not fail the coverage check.
pub fn validate_network(
    graph: &Graph,
    chains: &[EdgeChain],
    network: &CorridorNetwork,
    pruned_edges: &[String],
) -> Result<(), InvariantError> {
    for chain in chains {
        check_chain_continuity(graph, chain)?;
    }
    check_chain_coverage(graph, chains, pruned_edges)?;
    check_adjacency_symmetry(network)?;
    check_score_clamping(network)?;
    check_connector_sanitization(network)?;
    Ok(())
}

fn chain_label(chain: &EdgeChain) -> String {
    format!("{}..{}", chain.start_node_id, chain.end_node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, Corridor, CorridorAttributes, CorridorType, RoadClass, Surface};
    use std::collections::HashMap;

    #[test]
    fn asymmetric_adjacency_is_rejected() {
        let mut network = CorridorNetwork::new();
        network.adjacency.insert("a".to_string(), vec!["b".to_string()]);
        network.adjacency.insert("b".to_string(), vec![]);
        assert!(check_adjacency_symmetry(&network).is_err());
    }

    #[test]
    fn symmetric_adjacency_passes() {
        let mut network = CorridorNetwork::new();
        network.adjacency.insert("a".to_string(), vec!["b".to_string()]);
        network.adjacency.insert("b".to_string(), vec!["a".to_string()]);
        assert!(check_adjacency_symmetry(&network).is_ok());
    }

    fn minimal_corridor(id: &str, overall: f64) -> Corridor {
        let mut scores = HashMap::new();
        scores.insert(
            crate::model::Activity::Running,
            crate::model::ActivityScoreBreakdown { overall, flow: 0.5, safety: 0.5, surface: 0.5, character: 0.5, scenic: 0.5, elevation: 0.5 },
        );
        Corridor {
            id: id.to_string(),
            name: None,
            corridor_type: CorridorType::Neighborhood,
            attributes: CorridorAttributes {
                length_meters: 100.0,
                predominant_road_class: RoadClass::Residential,
                predominant_surface: Surface::Paved,
                surface_confidence: 1.0,
                bicycle_infra_continuity: 0.0,
                pedestrian_path_continuity: 0.0,
                separation_continuity: 0.0,
                traffic_calming_continuity: 0.0,
                scenic_score: 0.0,
                average_speed_limit: None,
                stop_density_per_km: 0.0,
                crossing_density_per_km: 0.0,
                turns_count: 0,
                elevation: None,
                name: None,
                name_consistency: 0.0,
            },
            edge_ids: vec![],
            start_node_id: "a".into(),
            end_node_id: "b".into(),
            geometry: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)],
            one_way: false,
            scores,
        }
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let mut network = CorridorNetwork::new();
        network.corridors.insert("c0".into(), minimal_corridor("c0", 1.4));
        assert!(check_score_clamping(&network).is_err());
    }

    #[test]
    fn in_range_score_passes() {
        let mut network = CorridorNetwork::new();
        network.corridors.insert("c0".into(), minimal_corridor("c0", 0.8));
        assert!(check_score_clamping(&network).is_ok());
    }

    #[test]
    fn candidate_revisiting_an_edge_is_rejected() {
        let mut candidate = SearchCandidate::start("a".to_string());
        candidate.edge_path.push("e1".into());
        candidate.edge_path.push("e1".into());
        assert!(check_no_revisit(&candidate).is_err());
    }
}
