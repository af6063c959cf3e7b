//! Corridor/connector assembly (§4.F): chains that clear the tier gate
//! become corridors; the rest survive only as connectors that sanitize to
//! ≥2 distinct adjacent corridors, stitching the corridor network together.

use indexmap::IndexMap;

use crate::aggregate::aggregate_attributes;
use crate::classify::{chain_passes_tier, classify_corridor_type, MinLengthByTier};
use crate::compat::CompatibilityOptions;
use crate::model::{
    Connector, ConnectorAttributes, Corridor, CorridorAttributes, CorridorNetwork, EdgeChain, EdgeId, Graph, NodeId,
    RoadClassGroup,
};

pub struct AssembleOptions {
    pub min_length_by_tier: MinLengthByTier,
    pub compatibility: CompatibilityOptions,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            min_length_by_tier: MinLengthByTier::default(),
            compatibility: CompatibilityOptions::default(),
        }
    }
}

/// Every graph node touched by any edge of the chain, both endpoints of
/// every underlying edge and not just the chain's own start/end (§4.F).
fn touched_nodes(graph: &Graph, edge_ids: &[EdgeId]) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    for id in edge_ids {
        let edge = graph.edges.get(id).unwrap();
        for n in [&edge.from_node_id, &edge.to_node_id] {
            if !nodes.contains(n) {
                nodes.push(n.clone());
            }
        }
    }
    nodes
}

fn corridor_attributes(out: &crate::aggregate::AggregateOutput) -> CorridorAttributes {
    CorridorAttributes {
        length_meters: out.length_meters,
        predominant_road_class: out.predominant_road_class,
        predominant_surface: out.predominant_surface,
        surface_confidence: out.surface_confidence,
        bicycle_infra_continuity: out.bicycle_infra_continuity,
        pedestrian_path_continuity: out.pedestrian_path_continuity,
        separation_continuity: out.separation_continuity,
        traffic_calming_continuity: out.traffic_calming_continuity,
        scenic_score: out.scenic_score,
        average_speed_limit: out.average_speed_limit,
        stop_density_per_km: out.stop_density_per_km,
        crossing_density_per_km: out.crossing_density_per_km,
        turns_count: out.turns_count,
        elevation: out.elevation.clone(),
        name: out.name.clone(),
        name_consistency: out.name_consistency,
    }
}

fn connector_attributes(graph: &Graph, chain: &EdgeChain, out: &crate::aggregate::AggregateOutput) -> ConnectorAttributes {
    let mut has_signal = false;
    let mut has_stop = false;
    let mut crosses_major_road = false;

    for id in &chain.edge_ids {
        let edge = graph.edges.get(id).unwrap();
        if edge.attributes.traffic_signal_count.unwrap_or(0) > 0 {
            has_signal = true;
        }
        if edge.attributes.stop_sign_count.unwrap_or(0) > 0 {
            has_stop = true;
        }
        if edge.attributes.road_class.group() == RoadClassGroup::ThroughRoad {
            crosses_major_road = true;
        }
    }
    for node_id in [&chain.start_node_id, &chain.end_node_id] {
        if let Some(node) = graph.nodes.get(node_id) {
            has_signal |= node.has_signal.unwrap_or(false);
            has_stop |= node.has_stop.unwrap_or(false);
        }
    }

    let crossing_difficulty = (has_signal as u8 as f64) * 0.3
        + (has_stop as u8 as f64) * 0.2
        + (crosses_major_road as u8 as f64) * 0.5;

    ConnectorAttributes {
        length_meters: out.length_meters,
        crosses_major_road,
        has_signal,
        has_stop,
        crossing_difficulty: crossing_difficulty.clamp(0.0, 1.0),
    }
}

pub fn assemble_network(graph: &Graph, chains: Vec<EdgeChain>, opts: &AssembleOptions) -> CorridorNetwork {
    let mut network = CorridorNetwork::new();
    let mut node_to_corridors: IndexMap<NodeId, Vec<String>> = IndexMap::new();
    let mut connector_candidates: Vec<(String, EdgeChain, ConnectorAttributes)> = Vec::new();

    for (i, chain) in chains.into_iter().enumerate() {
        let out = aggregate_attributes(graph, &chain.edge_ids);
        let attrs = corridor_attributes(&out);

        if chain_passes_tier(graph, &chain, &attrs, &opts.min_length_by_tier, &opts.compatibility) {
            let id = format!("corridor:{i}");
            let corridor_type = classify_corridor_type(&attrs);
            let one_way = chain
                .edge_ids
                .iter()
                .all(|eid| graph.edges.get(eid).unwrap().attributes.one_way);
            for node_id in touched_nodes(graph, &chain.edge_ids) {
                node_to_corridors.entry(node_id).or_default().push(id.clone());
            }

            network.corridors.insert(
                id.clone(),
                Corridor {
                    id,
                    name: attrs.name.clone(),
                    corridor_type,
                    attributes: attrs,
                    edge_ids: chain.edge_ids,
                    start_node_id: chain.start_node_id,
                    end_node_id: chain.end_node_id,
                    geometry: out.geometry,
                    one_way,
                    scores: std::collections::HashMap::new(),
                },
            );
        } else {
            let connector_attrs = connector_attributes(graph, &chain, &out);
            connector_candidates.push((format!("connector:{i}"), chain, connector_attrs));
        }
    }

    // Corridor-corridor adjacency via shared nodes (every node touched by
    // either corridor's edges, not just its chain endpoints).
    for (node_id, corridor_ids) in &node_to_corridors {
        for a in corridor_ids {
            for b in corridor_ids {
                if a != b {
                    link_adjacency(&mut network.adjacency, a, b);
                }
            }
        }
        let _ = node_id;
    }

    for (id, chain, attrs) in connector_candidates {
        let mut touching: Vec<String> = Vec::new();
        for node_id in touched_nodes(graph, &chain.edge_ids) {
            if let Some(ids) = node_to_corridors.get(&node_id) {
                for cid in ids {
                    if !touching.contains(cid) {
                        touching.push(cid.clone());
                    }
                }
            }
        }

        if touching.len() < 2 {
            continue;
        }

        let out = aggregate_attributes(graph, &chain.edge_ids);
        for a in &touching {
            for b in &touching {
                if a != b {
                    link_adjacency(&mut network.adjacency, a, b);
                }
            }
        }

        network.connectors.insert(
            id.clone(),
            Connector {
                id,
                edge_ids: chain.edge_ids,
                corridor_ids: touching,
                start_node_id: chain.start_node_id,
                end_node_id: chain.end_node_id,
                attributes: attrs,
                geometry: out.geometry,
            },
        );
    }

    network
}

fn link_adjacency(adjacency: &mut IndexMap<String, Vec<String>>, a: &str, b: &str) {
    let entry = adjacency.entry(a.to_string()).or_default();
    if !entry.iter().any(|x| x == b) {
        entry.push(b.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainbuild::{build_chains, ChainBuildOptions};
    use crate::model::{EdgeAttributes, Coordinate, GraphEdge, GraphNode, Infrastructure, RoadClass, Surface, SurfaceClassification};

    fn node(id: &str, lat: f64, lng: f64) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            coordinate: Coordinate::new(lat, lng),
            is_crossing: None,
            has_stop: None,
            has_signal: None,
            elevation_meters: None,
        }
    }

    fn attrs(road_class: RoadClass, name: Option<&str>, length: f64) -> EdgeAttributes {
        EdgeAttributes {
            road_class,
            surface: SurfaceClassification { surface: Surface::Paved, confidence: 1.0, has_conflict: false },
            infrastructure: Infrastructure::default(),
            one_way: false,
            length_meters: length,
            name: name.map(str::to_string),
            speed_limit_kmh: Some(30.0),
            lanes: None,
            stop_sign_count: None,
            traffic_signal_count: None,
            road_crossing_count: None,
            elevation_gain: None,
            elevation_loss: None,
            average_grade: None,
            max_grade: None,
            scenic_designation: false,
            enrichment: None,
        }
    }

    fn add_two_way(graph: &mut Graph, base_id: &str, from: &str, to: &str, road_class: RoadClass, name: Option<&str>, length: f64) {
        let from_c = graph.nodes.get(from).unwrap().coordinate;
        let to_c = graph.nodes.get(to).unwrap().coordinate;
        graph.add_edge(GraphEdge {
            id: format!("{base_id}:f"),
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
            geometry: vec![from_c, to_c],
            attributes: attrs(road_class, name, length),
        });
        graph.add_edge(GraphEdge {
            id: format!("{base_id}:r"),
            from_node_id: to.to_string(),
            to_node_id: from.to_string(),
            geometry: vec![to_c, from_c],
            attributes: attrs(road_class, name, length),
        });
    }

    /// Two long named corridors joined by a short unnamed link: the link
    /// is too short to stand as its own corridor but connects exactly two
    /// distinct corridors, so it should survive as a sanitized connector.
    #[test]
    fn short_link_between_two_corridors_becomes_a_connector() {
        let mut graph = Graph::new();
        graph.add_node(node("a", 45.0, 0.00));
        graph.add_node(node("b", 45.0, 0.02));
        graph.add_node(node("c", 45.0, 0.021));
        graph.add_node(node("d", 45.0, 0.04));

        // `bc`'s road class sits in a different compatibility group than its
        // neighbors, so the chain builder never merges it into either one.
        add_two_way(&mut graph, "ab", "a", "b", RoadClass::Residential, Some("First Ave"), 1500.0);
        add_two_way(&mut graph, "bc", "b", "c", RoadClass::Track, None, 80.0);
        add_two_way(&mut graph, "cd", "c", "d", RoadClass::Residential, Some("Second Ave"), 1500.0);

        let chains = build_chains(&graph, &ChainBuildOptions::default());
        let network = assemble_network(&graph, chains, &AssembleOptions::default());

        assert_eq!(network.corridors.len(), 2);
        assert_eq!(network.connectors.len(), 1);
        let connector = network.connectors.values().next().unwrap();
        assert_eq!(connector.corridor_ids.len(), 2);
    }
}
