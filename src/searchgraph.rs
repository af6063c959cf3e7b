//! Search-graph construction (§4.H): flattens a scored corridor network
//! into the per-activity graph the beam search walks, applying each
//! activity's exclusion filters.

use crate::model::{
    Activity, Connector, Corridor, CorridorNetwork, CorridorType, EdgeId, Graph, RoadClass, SearchEdge,
    SearchEdgeKind, SearchGraph, Surface,
};

#[derive(Debug, Clone)]
pub struct ActivityExclusions {
    pub excluded_types: Vec<CorridorType>,
    pub excluded_surfaces: Vec<Surface>,
    pub excluded_road_classes: Vec<RoadClass>,
    /// Connectors that cross a major road with no signal or stop control
    /// are excluded outright for this activity.
    pub avoid_uncontrolled_major_crossings: bool,
}

impl ActivityExclusions {
    pub fn default_for(activity: Activity) -> Self {
        use CorridorType::*;
        use RoadClass::*;

        match activity {
            Activity::RoadCycling => Self {
                excluded_types: vec![],
                excluded_surfaces: vec![],
                excluded_road_classes: vec![Footway],
                avoid_uncontrolled_major_crossings: false,
            },
            Activity::GravelCycling => Self {
                excluded_types: vec![Arterial],
                excluded_surfaces: vec![],
                excluded_road_classes: vec![Motorway, Trunk, Footway],
                avoid_uncontrolled_major_crossings: false,
            },
            Activity::Running => Self {
                excluded_types: vec![],
                excluded_surfaces: vec![],
                excluded_road_classes: vec![Motorway, Trunk],
                avoid_uncontrolled_major_crossings: true,
            },
            Activity::Walking => Self {
                excluded_types: vec![Arterial],
                excluded_surfaces: vec![],
                excluded_road_classes: vec![Motorway, Trunk, Primary],
                avoid_uncontrolled_major_crossings: true,
            },
        }
    }

    fn allows_corridor(&self, corridor: &crate::model::Corridor) -> bool {
        !self.excluded_types.contains(&corridor.corridor_type)
            && !self.excluded_surfaces.contains(&corridor.attributes.predominant_surface)
            && !self.excluded_road_classes.contains(&corridor.attributes.predominant_road_class)
    }

    fn allows_connector(&self, connector: &crate::model::Connector) -> bool {
        if self.avoid_uncontrolled_major_crossings
            && connector.attributes.crosses_major_road
            && !connector.attributes.has_signal
            && !connector.attributes.has_stop
        {
            return false;
        }
        true
    }
}

/// Builds the flattened search graph for one activity. Corridors and
/// connectors excluded by the activity's filters simply don't appear.
///
/// Emits one `SearchEdge` per underlying `GraphEdge`, not one per corridor,
/// so the beam search can branch off onto a connector that attaches partway
/// along a corridor (§4.H).
pub fn build_search_graph(graph: &Graph, network: &CorridorNetwork, activity: Activity) -> SearchGraph {
    let exclusions = ActivityExclusions::default_for(activity);
    let mut search_graph = SearchGraph::new();

    for corridor in network.corridors.values() {
        if !exclusions.allows_corridor(corridor) {
            continue;
        }
        let score = corridor
            .scores
            .get(&activity)
            .map(|b| b.overall)
            .unwrap_or(0.5);

        register_touched_nodes(&mut search_graph, graph, &corridor.edge_ids);

        for edge_id in &corridor.edge_ids {
            let edge = graph.edges.get(edge_id).unwrap();
            push_edge(&mut search_graph, &edge.from_node_id, SearchEdge {
                graph_edge_id: edge.id.clone(),
                corridor_id: corridor.id.clone(),
                kind: SearchEdgeKind::Corridor,
                target_node_id: edge.to_node_id.clone(),
                length_meters: edge.attributes.length_meters,
                score,
            });
        }

        if !corridor.one_way {
            for edge_id in corridor.edge_ids.iter().rev() {
                let edge = graph.edges.get(edge_id).unwrap();
                let Some(counterpart_id) = edge.counterpart_id() else { continue };
                let Some(counterpart) = graph.edges.get(&counterpart_id) else { continue };
                push_edge(&mut search_graph, &counterpart.from_node_id, SearchEdge {
                    graph_edge_id: counterpart.id.clone(),
                    corridor_id: corridor.id.clone(),
                    kind: SearchEdgeKind::Corridor,
                    target_node_id: counterpart.to_node_id.clone(),
                    length_meters: counterpart.attributes.length_meters,
                    score,
                });
            }
        }
    }

    for connector in network.connectors.values() {
        if !exclusions.allows_connector(connector) {
            continue;
        }
        let score = 1.0 - connector.attributes.crossing_difficulty;

        register_touched_nodes(&mut search_graph, graph, &connector.edge_ids);

        for edge_id in &connector.edge_ids {
            let edge = graph.edges.get(edge_id).unwrap();
            if exclusions.excluded_road_classes.contains(&edge.attributes.road_class) {
                continue;
            }
            push_edge(&mut search_graph, &edge.from_node_id, SearchEdge {
                graph_edge_id: edge.id.clone(),
                corridor_id: String::new(),
                kind: SearchEdgeKind::Connector,
                target_node_id: edge.to_node_id.clone(),
                length_meters: edge.attributes.length_meters,
                score,
            });
            if let Some(counterpart_id) = edge.counterpart_id() {
                if let Some(counterpart) = graph.edges.get(&counterpart_id) {
                    push_edge(&mut search_graph, &counterpart.from_node_id, SearchEdge {
                        graph_edge_id: counterpart.id.clone(),
                        corridor_id: String::new(),
                        kind: SearchEdgeKind::Connector,
                        target_node_id: counterpart.to_node_id.clone(),
                        length_meters: counterpart.attributes.length_meters,
                        score,
                    });
                }
            }
        }
    }

    search_graph
}

/// Registers every node touched by any of `edge_ids`, both endpoints of
/// every underlying edge, with its real coordinate from `graph` (§4.F/§4.H).
fn register_touched_nodes(search_graph: &mut SearchGraph, graph: &Graph, edge_ids: &[EdgeId]) {
    for edge_id in edge_ids {
        let edge = graph.edges.get(edge_id).unwrap();
        for node_id in [&edge.from_node_id, &edge.to_node_id] {
            if search_graph.node_coordinates.contains_key(node_id) {
                continue;
            }
            if let Some(node) = graph.nodes.get(node_id) {
                search_graph.node_coordinates.insert(node_id.clone(), node.coordinate);
            }
        }
    }
}

fn push_edge(graph: &mut SearchGraph, from_node: &str, edge: SearchEdge) {
    graph.adjacency.entry(from_node.to_string()).or_default().push(edge);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Coordinate, Corridor, CorridorAttributes, EdgeAttributes, GraphEdge, GraphNode, Infrastructure,
        SurfaceClassification,
    };
    use std::collections::HashMap;

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

    fn edge_attrs(road_class: RoadClass) -> EdgeAttributes {
        EdgeAttributes {
            road_class,
            surface: SurfaceClassification { surface: Surface::Paved, confidence: 1.0, has_conflict: false },
            infrastructure: Infrastructure::default(),
            one_way: false,
            length_meters: 1000.0,
            name: None,
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

    /// A two-node, one-edge graph with the `:f`/`:r` convention, so reverse
    /// corridor traversal can find a counterpart.
    fn two_way_graph(road_class: RoadClass) -> Graph {
        let mut graph = Graph::new();
        graph.add_node(node("a", 45.0, 0.0));
        graph.add_node(node("b", 45.0, 0.01));
        let mut fwd = edge_attrs(road_class);
        fwd.one_way = false;
        graph.add_edge(GraphEdge {
            id: "e0:f".into(),
            from_node_id: "a".into(),
            to_node_id: "b".into(),
            geometry: vec![Coordinate::new(45.0, 0.0), Coordinate::new(45.0, 0.01)],
            attributes: fwd.clone(),
        });
        graph.add_edge(GraphEdge {
            id: "e0:r".into(),
            from_node_id: "b".into(),
            to_node_id: "a".into(),
            geometry: vec![Coordinate::new(45.0, 0.01), Coordinate::new(45.0, 0.0)],
            attributes: fwd,
        });
        graph
    }

    fn one_way_graph(road_class: RoadClass) -> Graph {
        let mut graph = Graph::new();
        graph.add_node(node("a", 45.0, 0.0));
        graph.add_node(node("b", 45.0, 0.01));
        let mut attrs = edge_attrs(road_class);
        attrs.one_way = true;
        graph.add_edge(GraphEdge {
            id: "e0".into(),
            from_node_id: "a".into(),
            to_node_id: "b".into(),
            geometry: vec![Coordinate::new(45.0, 0.0), Coordinate::new(45.0, 0.01)],
            attributes: attrs,
        });
        graph
    }

    fn corridor(id: &str, edge_ids: Vec<&str>, corridor_type: CorridorType, one_way: bool) -> Corridor {
        Corridor {
            id: id.to_string(),
            name: None,
            corridor_type,
            attributes: CorridorAttributes {
                length_meters: 1000.0,
                predominant_road_class: RoadClass::Residential,
                predominant_surface: Surface::Paved,
                surface_confidence: 1.0,
                bicycle_infra_continuity: 0.0,
                pedestrian_path_continuity: 0.0,
                separation_continuity: 0.0,
                traffic_calming_continuity: 0.0,
                scenic_score: 0.0,
                average_speed_limit: Some(30.0),
                stop_density_per_km: 0.0,
                crossing_density_per_km: 0.0,
                turns_count: 0,
                elevation: None,
                name: None,
                name_consistency: 0.0,
            },
            edge_ids: edge_ids.into_iter().map(str::to_string).collect(),
            start_node_id: "a".into(),
            end_node_id: "b".into(),
            geometry: vec![Coordinate::new(45.0, 0.0), Coordinate::new(45.0, 0.01)],
            one_way,
            scores: HashMap::new(),
        }
    }

    #[test]
    fn two_way_corridor_produces_edges_in_both_directions() {
        let graph = two_way_graph(RoadClass::Residential);
        let mut network = CorridorNetwork::new();
        network.corridors.insert(
            "c0".into(),
            corridor("c0", vec!["e0:f"], CorridorType::Neighborhood, false),
        );
        let search_graph = build_search_graph(&graph, &network, Activity::Running);
        assert_eq!(search_graph.outgoing("a").len(), 1);
        assert_eq!(search_graph.outgoing("b").len(), 1);
        assert_eq!(search_graph.outgoing("a")[0].graph_edge_id, "e0:f");
        assert_eq!(search_graph.outgoing("b")[0].graph_edge_id, "e0:r");
    }

    #[test]
    fn one_way_corridor_produces_a_single_direction() {
        let graph = one_way_graph(RoadClass::Residential);
        let mut network = CorridorNetwork::new();
        network.corridors.insert("c0".into(), corridor("c0", vec!["e0"], CorridorType::Neighborhood, true));
        let search_graph = build_search_graph(&graph, &network, Activity::Running);
        assert_eq!(search_graph.outgoing("a").len(), 1);
        assert_eq!(search_graph.outgoing("b").len(), 0);
    }

    #[test]
    fn motorway_corridor_is_excluded_for_walking() {
        let graph = two_way_graph(RoadClass::Motorway);
        let mut network = CorridorNetwork::new();
        network.corridors.insert(
            "c0".into(),
            corridor("c0", vec!["e0:f"], CorridorType::Arterial, false),
        );
        let search_graph = build_search_graph(&graph, &network, Activity::Walking);
        assert_eq!(search_graph.outgoing("a").len(), 0);
    }
}
