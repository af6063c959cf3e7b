//! Route materialization (§4.K): turns a beam-search candidate's path of
//! underlying graph edges into a displayable route — grouped segments,
//! concatenated geometry, and summary stats.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::aggregate::count_turns;
use crate::model::{Coordinate, CorridorNetwork, CorridorType, EdgeId, Graph, SearchCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Corridor,
    Connector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub id: String,
    pub name: Option<String>,
    pub corridor_type: Option<CorridorType>,
    pub length_meters: f64,
    pub geometry: Vec<Coordinate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteStats {
    pub total_distance_m: f64,
    pub corridor_distance_m: f64,
    pub connector_distance_m: f64,
    pub total_elevation_gain_m: f64,
    pub total_elevation_loss_m: f64,
    pub average_corridor_score: f64,
    pub corridor_count: u32,
    pub connector_count: u32,
    pub turns_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedRoute {
    pub segments: Vec<RouteSegment>,
    pub geometry: Vec<Coordinate>,
    pub stats: RouteStats,
}

#[derive(Debug, Clone, Copy)]
enum Owner<'a> {
    Corridor(&'a str),
    Connector(&'a str),
}

/// Maps every underlying graph edge id (in either travel direction) back to
/// the corridor or connector that claimed it during assembly, so a run of
/// `SearchEdge`s can be re-grouped into the corridor/connector segments a
/// rider thinks of the route as (§4.F assigns each edge to exactly one).
fn build_edge_owner_index<'n>(graph: &Graph, network: &'n CorridorNetwork) -> FxHashMap<EdgeId, Owner<'n>> {
    let mut index = FxHashMap::default();
    for corridor in network.corridors.values() {
        for edge_id in &corridor.edge_ids {
            index.insert(edge_id.clone(), Owner::Corridor(&corridor.id));
            if let Some(counterpart) = graph.edges.get(edge_id).and_then(|e| e.counterpart_id()) {
                index.insert(counterpart, Owner::Corridor(&corridor.id));
            }
        }
    }
    for connector in network.connectors.values() {
        for edge_id in &connector.edge_ids {
            index.insert(edge_id.clone(), Owner::Connector(&connector.id));
            if let Some(counterpart) = graph.edges.get(edge_id).and_then(|e| e.counterpart_id()) {
                index.insert(counterpart, Owner::Connector(&connector.id));
            }
        }
    }
    index
}

/// Builds one raw segment per contiguous run of edges owned by the same
/// corridor/connector. Each underlying edge's own geometry and elevation
/// attributes are already oriented the way the candidate walked it, since
/// the search graph picked the directed edge id matching that direction.
fn raw_segments(
    candidate: &SearchCandidate,
    graph: &Graph,
    network: &CorridorNetwork,
) -> Vec<(SegmentKind, RouteSegment, f64, f64)> {
    let owners = build_edge_owner_index(graph, network);
    let mut segments: Vec<(SegmentKind, RouteSegment, f64, f64)> = Vec::new();

    for edge_id in &candidate.edge_path {
        let Some(edge) = graph.edges.get(edge_id) else { continue };
        let owner = owners.get(edge_id).copied();
        let (kind, owner_id, name, corridor_type) = match owner {
            Some(Owner::Corridor(id)) => {
                let corridor = network.corridors.get(id);
                (SegmentKind::Corridor, id.to_string(), corridor.and_then(|c| c.name.clone()), corridor.map(|c| c.corridor_type))
            }
            Some(Owner::Connector(id)) => (SegmentKind::Connector, id.to_string(), None, None),
            None => (SegmentKind::Connector, edge_id.clone(), None, None),
        };
        let gain = edge.attributes.elevation_gain.unwrap_or(0.0);
        let loss = edge.attributes.elevation_loss.unwrap_or(0.0);

        let extends_last = segments
            .last()
            .is_some_and(|(last_kind, last_seg, _, _)| *last_kind == kind && last_seg.id == owner_id);

        if extends_last {
            let (_, last_seg, last_gain, last_loss) = segments.last_mut().unwrap();
            last_seg.length_meters += edge.attributes.length_meters;
            last_seg.geometry.extend(edge.geometry.iter().skip(1).copied());
            *last_gain += gain;
            *last_loss += loss;
        } else {
            segments.push((
                kind,
                RouteSegment {
                    id: owner_id,
                    name,
                    corridor_type,
                    length_meters: edge.attributes.length_meters,
                    geometry: edge.geometry.clone(),
                },
                gain,
                loss,
            ));
        }
    }

    segments
}

/// Merges consecutive segments that share a name into one display segment;
/// a named street that happens to span two adjacent corridor records
/// should read as one thing on the map.
fn group_segments(raw: Vec<(SegmentKind, RouteSegment, f64, f64)>) -> Vec<RouteSegment> {
    let mut grouped: Vec<RouteSegment> = Vec::new();

    for (_, segment, _, _) in raw {
        let merge = grouped
            .last()
            .is_some_and(|prev| prev.name.is_some() && prev.name == segment.name);

        if merge {
            let prev = grouped.last_mut().unwrap();
            prev.length_meters += segment.length_meters;
            if let Some(last) = prev.geometry.last().copied() {
                if last == segment.geometry.first().copied().unwrap_or(last) {
                    prev.geometry.extend(segment.geometry.iter().skip(1).copied());
                } else {
                    prev.geometry.extend(segment.geometry.iter().copied());
                }
            } else {
                prev.geometry = segment.geometry;
            }
        } else {
            grouped.push(segment);
        }
    }

    grouped
}

fn concatenate_route_geometry(raw: &[(SegmentKind, RouteSegment, f64, f64)]) -> Vec<Coordinate> {
    let mut points: Vec<Coordinate> = Vec::new();
    for (i, (_, segment, _, _)) in raw.iter().enumerate() {
        if i == 0 {
            points.extend(segment.geometry.iter().copied());
        } else {
            points.extend(segment.geometry.iter().skip(1).copied());
        }
    }
    points
}

pub fn materialize_route(candidate: &SearchCandidate, graph: &Graph, network: &CorridorNetwork) -> MaterializedRoute {
    let raw = raw_segments(candidate, graph, network);

    let mut stats = RouteStats::default();
    for (kind, segment, gain, loss) in &raw {
        stats.total_distance_m += segment.length_meters;
        match kind {
            SegmentKind::Corridor => {
                stats.corridor_distance_m += segment.length_meters;
                stats.corridor_count += 1;
            }
            SegmentKind::Connector => {
                stats.connector_distance_m += segment.length_meters;
                stats.connector_count += 1;
            }
        }
        stats.total_elevation_gain_m += gain;
        stats.total_elevation_loss_m += loss;
    }
    stats.turns_count = count_turns(graph, &candidate.edge_path);
    stats.average_corridor_score = candidate.avg_corridor_score();

    let geometry = concatenate_route_geometry(&raw);
    let segments = group_segments(raw);

    MaterializedRoute { segments, geometry, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Activity, ActivityScoreBreakdown, Corridor, CorridorAttributes, EdgeAttributes, GraphEdge, GraphNode,
        Infrastructure, RoadClass, Surface, SurfaceClassification,
    };
    use std::collections::HashMap;

    fn node(id: &str, lat: f64, lng: f64) -> GraphNode {
        GraphNode { id: id.to_string(), coordinate: Coordinate::new(lat, lng), is_crossing: None, has_stop: None, has_signal: None, elevation_meters: None }
    }

    fn edge_attrs(length: f64) -> EdgeAttributes {
        EdgeAttributes {
            road_class: RoadClass::Residential,
            surface: SurfaceClassification { surface: Surface::Paved, confidence: 1.0, has_conflict: false },
            infrastructure: Infrastructure::default(),
            one_way: false,
            length_meters: length,
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

    fn add_two_way(graph: &mut Graph, base_id: &str, from: &str, to: &str, length: f64) {
        let from_c = graph.nodes.get(from).unwrap().coordinate;
        let to_c = graph.nodes.get(to).unwrap().coordinate;
        graph.add_edge(GraphEdge {
            id: format!("{base_id}:f"),
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
            geometry: vec![from_c, to_c],
            attributes: edge_attrs(length),
        });
        graph.add_edge(GraphEdge {
            id: format!("{base_id}:r"),
            from_node_id: to.to_string(),
            to_node_id: from.to_string(),
            geometry: vec![to_c, from_c],
            attributes: edge_attrs(length),
        });
    }

    fn corridor(id: &str, edge_id: &str, start: &str, end: &str, name: Option<&str>, length: f64) -> Corridor {
        let mut scores = HashMap::new();
        scores.insert(
            Activity::Running,
            ActivityScoreBreakdown { overall: 0.8, flow: 0.8, safety: 0.8, surface: 0.8, character: 0.8, scenic: 0.8, elevation: 0.8 },
        );
        Corridor {
            id: id.to_string(),
            name: name.map(str::to_string),
            corridor_type: CorridorType::Neighborhood,
            attributes: CorridorAttributes {
                length_meters: length,
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
                turns_count: 1,
                elevation: None,
                name: name.map(str::to_string),
                name_consistency: 1.0,
            },
            edge_ids: vec![edge_id.to_string()],
            start_node_id: start.to_string(),
            end_node_id: end.to_string(),
            geometry: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)],
            one_way: false,
            scores,
        }
    }

    #[test]
    fn traversal_against_corridor_direction_uses_the_reverse_edge_geometry() {
        let mut graph = Graph::new();
        graph.add_node(node("a", 0.0, 0.0));
        graph.add_node(node("b", 0.0, 0.01));
        add_two_way(&mut graph, "e0", "a", "b", 500.0);

        let mut network = CorridorNetwork::new();
        network.corridors.insert("c0".into(), corridor("c0", "e0:f", "a", "b", Some("Elm St"), 500.0));

        let mut candidate = SearchCandidate::start("b".to_string());
        candidate.edge_path.push("e0:r".into());
        candidate.node_path.push("a".into());

        let route = materialize_route(&candidate, &graph, &network);
        assert_eq!(route.geometry.first().copied(), Some(Coordinate::new(0.0, 0.01)));
        assert_eq!(route.geometry.last().copied(), Some(Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn consecutive_same_named_corridors_merge_into_one_segment() {
        let mut graph = Graph::new();
        graph.add_node(node("a", 0.0, 0.0));
        graph.add_node(node("b", 0.0, 0.01));
        graph.add_node(node("c", 0.0, 0.02));
        add_two_way(&mut graph, "e0", "a", "b", 500.0);
        add_two_way(&mut graph, "e1", "b", "c", 500.0);

        let mut network = CorridorNetwork::new();
        network.corridors.insert("c0".into(), corridor("c0", "e0:f", "a", "b", Some("Elm St"), 500.0));
        network.corridors.insert("c1".into(), corridor("c1", "e1:f", "b", "c", Some("Elm St"), 500.0));

        let mut candidate = SearchCandidate::start("a".to_string());
        candidate.edge_path.push("e0:f".into());
        candidate.edge_path.push("e1:f".into());
        candidate.node_path.push("a".into());
        candidate.node_path.push("b".into());
        candidate.node_path.push("c".into());

        let route = materialize_route(&candidate, &graph, &network);
        assert_eq!(route.segments.len(), 1);
        assert!((route.segments[0].length_meters - 1000.0).abs() < 1e-9);
    }
}
