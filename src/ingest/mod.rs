//! OSM PBF ingestion: turns a `.osm.pbf` extract into a [`Graph`] (§3, §6
//! upstream contract). Nodes and ways are extracted in separate passes,
//! each collected under a `Mutex` and sorted by id for deterministic
//! output.
//!
//! Per §7, malformed individual elements (a way referencing a missing
//! node, an unroutable highway tag) are skipped and counted rather than
//! failing the whole ingest; only an unreadable file is a hard error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use osmpbf::{Element, ElementReader};
use tracing::warn;

use crate::error::IngestError;
use crate::model::{
    Coordinate, EdgeAttributes, Enrichment, Graph, GraphEdge, GraphNode, Infrastructure, RoadClass,
    Surface, SurfaceClassification,
};

pub struct IngestConfig {
    pub input: PathBuf,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub nodes_parsed: u64,
    pub ways_parsed: u64,
    pub ways_skipped: u64,
    pub edges_created: u64,
}

struct RawNode {
    lat: f64,
    lon: f64,
    tags: HashMap<String, String>,
}

struct RawWay {
    id: i64,
    refs: Vec<i64>,
    tags: HashMap<String, String>,
}

pub fn run_ingest(config: IngestConfig) -> Result<(Graph, IngestStats), IngestError> {
    let nodes = extract_nodes(&config.input)?;
    let ways = extract_ways(&config.input)?;

    let mut stats = IngestStats {
        nodes_parsed: nodes.len() as u64,
        ..Default::default()
    };

    let mut ref_counts: HashMap<i64, u32> = HashMap::new();
    let routable: Vec<&RawWay> = ways
        .iter()
        .filter(|w| road_class_for(&w.tags).is_some() && w.refs.len() >= 2)
        .collect();
    stats.ways_parsed = routable.len() as u64;
    stats.ways_skipped = (ways.len() - routable.len()) as u64;

    for way in &routable {
        for (i, node_id) in way.refs.iter().enumerate() {
            if i == 0 || i == way.refs.len() - 1 {
                *ref_counts.entry(*node_id).or_insert(0) += 2;
            } else {
                *ref_counts.entry(*node_id).or_insert(0) += 1;
            }
        }
    }

    let mut graph = Graph::new();

    for way in &routable {
        let Some(road_class) = road_class_for(&way.tags) else { continue };

        if way.refs.iter().any(|id| !nodes.contains_key(id)) {
            warn!(way = way.id, "way references a node missing from the extract, skipping");
            continue;
        }

        let boundaries = segment_boundaries(&way.refs, &ref_counts);
        let (one_way, reversed) = oneway_flags(&way.tags);
        let surface = surface_for(&way.tags);
        let infrastructure = infra_for(&way.tags, road_class);
        let name = way.tags.get("name").cloned();
        let speed_limit_kmh = parse_speed_kmh(&way.tags);
        let lanes = parse_lanes(&way.tags);
        let scenic_designation = way.tags.get("scenic").map(|v| v == "yes").unwrap_or(false);

        for (seg_idx, window) in boundaries.windows(2).enumerate() {
            let start = window[0];
            let end = window[1];
            let segment_refs = &way.refs[start..=end];

            for node_id in segment_refs {
                ensure_node(&mut graph, *node_id, &nodes);
            }

            let geometry: Vec<Coordinate> = segment_refs
                .iter()
                .map(|id| {
                    let raw = &nodes[id];
                    Coordinate::new(raw.lat, raw.lon)
                })
                .collect();
            let length_meters = polyline_length(&geometry);
            if length_meters <= 0.0 {
                continue;
            }

            let (stop_sign_count, traffic_signal_count, road_crossing_count) =
                count_node_markers(segment_refs, &nodes);

            let attributes = EdgeAttributes {
                road_class,
                surface,
                infrastructure,
                one_way,
                length_meters,
                name: name.clone(),
                speed_limit_kmh,
                lanes,
                stop_sign_count: Some(stop_sign_count),
                traffic_signal_count: Some(traffic_signal_count),
                road_crossing_count: Some(road_crossing_count),
                elevation_gain: None,
                elevation_loss: None,
                average_grade: None,
                max_grade: None,
                scenic_designation,
                enrichment: Some(Enrichment::default()),
            };

            let prefix = format!("w{}_{}", way.id, seg_idx);
            let from_id = segment_refs[0].to_string();
            let to_id = segment_refs[segment_refs.len() - 1].to_string();

            if one_way {
                let (from_node_id, to_node_id, geom) = if reversed {
                    (to_id.clone(), from_id.clone(), reverse(&geometry))
                } else {
                    (from_id.clone(), to_id.clone(), geometry.clone())
                };
                let edge = GraphEdge {
                    id: prefix,
                    from_node_id,
                    to_node_id,
                    geometry: geom,
                    attributes,
                };
                if graph.add_edge(edge) {
                    stats.edges_created += 1;
                }
            } else {
                let forward = GraphEdge {
                    id: format!("{prefix}:f"),
                    from_node_id: from_id.clone(),
                    to_node_id: to_id.clone(),
                    geometry: geometry.clone(),
                    attributes: attributes.clone(),
                };
                let backward = GraphEdge {
                    id: format!("{prefix}:r"),
                    from_node_id: to_id,
                    to_node_id: from_id,
                    geometry: reverse(&geometry),
                    attributes,
                };
                if graph.add_edge(forward) {
                    stats.edges_created += 1;
                }
                if graph.add_edge(backward) {
                    stats.edges_created += 1;
                }
            }
        }
    }

    Ok((graph, stats))
}

fn ensure_node(graph: &mut Graph, node_id: i64, nodes: &HashMap<i64, RawNode>) {
    let id = node_id.to_string();
    if graph.nodes.contains_key(&id) {
        return;
    }
    let Some(raw) = nodes.get(&node_id) else { return };
    let is_crossing = raw.tags.get("highway").map(|v| v == "crossing");
    let has_stop = raw.tags.get("highway").map(|v| v == "stop");
    let has_signal = raw.tags.get("highway").map(|v| v == "traffic_signals");
    let elevation_meters = raw.tags.get("ele").and_then(|v| v.parse::<f64>().ok());

    graph.add_node(GraphNode {
        id,
        coordinate: Coordinate::new(raw.lat, raw.lon),
        is_crossing,
        has_stop,
        has_signal,
        elevation_meters,
    });
}

/// Splits a way's node list wherever a node is shared with another way (or
/// is an endpoint), matching the standard "routing graph nodes are
/// junctions" convention. Always includes index 0 and the last index.
fn segment_boundaries(refs: &[i64], ref_counts: &HashMap<i64, u32>) -> Vec<usize> {
    let mut boundaries = vec![0];
    for (i, node_id) in refs.iter().enumerate().skip(1).take(refs.len().saturating_sub(2)) {
        if ref_counts.get(node_id).copied().unwrap_or(0) >= 2 {
            boundaries.push(i);
        }
    }
    let last = refs.len() - 1;
    if *boundaries.last().unwrap() != last {
        boundaries.push(last);
    }
    boundaries
}

fn count_node_markers(segment_refs: &[i64], nodes: &HashMap<i64, RawNode>) -> (u32, u32, u32) {
    let mut stop = 0;
    let mut signal = 0;
    let mut crossing = 0;
    for id in segment_refs {
        if let Some(raw) = nodes.get(id) {
            match raw.tags.get("highway").map(String::as_str) {
                Some("stop") => stop += 1,
                Some("traffic_signals") => signal += 1,
                Some("crossing") => crossing += 1,
                _ => {}
            }
        }
    }
    (stop, signal, crossing)
}

fn reverse(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut reversed = points.to_vec();
    reversed.reverse();
    reversed
}

fn polyline_length(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| crate::geo::haversine_distance(w[0], w[1])).sum()
}

fn road_class_for(tags: &HashMap<String, String>) -> Option<RoadClass> {
    use RoadClass::*;
    match tags.get("highway")?.as_str() {
        "motorway" | "motorway_link" => Some(Motorway),
        "trunk" | "trunk_link" => Some(Trunk),
        "primary" | "primary_link" => Some(Primary),
        "secondary" | "secondary_link" => Some(Secondary),
        "tertiary" | "tertiary_link" => Some(Tertiary),
        "residential" | "living_street" => Some(Residential),
        "unclassified" | "road" => Some(Unclassified),
        "service" => Some(Service),
        "cycleway" => Some(Cycleway),
        "path" | "bridleway" => Some(Path),
        "footway" | "pedestrian" | "steps" => Some(Footway),
        "track" => Some(Track),
        _ => None,
    }
}

fn surface_for(tags: &HashMap<String, String>) -> SurfaceClassification {
    const PAVED: &[&str] = &["asphalt", "concrete", "paving_stones", "sett", "concrete:plates", "concrete:lanes", "paved"];
    const UNPAVED: &[&str] = &["unpaved", "gravel", "dirt", "ground", "grass", "sand", "compacted", "fine_gravel", "mud", "earth"];

    match tags.get("surface").map(String::as_str) {
        Some(s) if PAVED.contains(&s) => SurfaceClassification { surface: Surface::Paved, confidence: 0.9, has_conflict: false },
        Some(s) if UNPAVED.contains(&s) => SurfaceClassification { surface: Surface::Unpaved, confidence: 0.9, has_conflict: false },
        Some(_) => SurfaceClassification { surface: Surface::Unknown, confidence: 0.3, has_conflict: false },
        None => SurfaceClassification { surface: Surface::Unknown, confidence: 0.0, has_conflict: false },
    }
}

fn infra_for(tags: &HashMap<String, String>, road_class: RoadClass) -> Infrastructure {
    let has_bicycle_infra = road_class == RoadClass::Cycleway
        || tags.get("cycleway").map(|v| v != "no").unwrap_or(false)
        || tags.get("bicycle").map(|v| v == "designated").unwrap_or(false);
    let has_pedestrian_path = matches!(road_class, RoadClass::Footway | RoadClass::Path)
        || tags.get("sidewalk").map(|v| v != "no").unwrap_or(false);
    let has_shoulder = tags.get("shoulder").map(|v| v == "yes").unwrap_or(false);
    let is_separated = tags.get("segregated").map(|v| v == "yes").unwrap_or(false);
    let has_traffic_calming = tags.contains_key("traffic_calming");

    Infrastructure { has_bicycle_infra, has_pedestrian_path, has_shoulder, is_separated, has_traffic_calming }
}

fn oneway_flags(tags: &HashMap<String, String>) -> (bool, bool) {
    match tags.get("oneway").map(String::as_str) {
        Some("-1") => (true, true),
        Some("yes") | Some("true") | Some("1") => (true, false),
        Some("no") | Some("0") | Some("false") => (false, false),
        _ => {
            let implied = tags.get("junction").map(|v| v == "roundabout").unwrap_or(false)
                || matches!(road_class_for(tags), Some(RoadClass::Motorway));
            (implied, false)
        }
    }
}

fn parse_speed_kmh(tags: &HashMap<String, String>) -> Option<f64> {
    let raw = tags.get("maxspeed")?;
    if let Some(mph) = raw.strip_suffix(" mph") {
        return mph.trim().parse::<f64>().ok().map(|v| v * 1.609344);
    }
    raw.trim().trim_end_matches(" km/h").parse::<f64>().ok()
}

fn parse_lanes(tags: &HashMap<String, String>) -> Option<u32> {
    tags.get("lanes")?.parse().ok()
}

fn extract_nodes<P: AsRef<Path>>(path: P) -> Result<HashMap<i64, RawNode>, IngestError> {
    let path = path.as_ref();
    let reader = ElementReader::from_path(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let nodes = Mutex::new(HashMap::new());
    reader
        .for_each(|element| {
            let (id, lat, lon, tags): (i64, f64, f64, Vec<(String, String)>) = match element {
                Element::Node(n) => (n.id(), n.lat(), n.lon(), n.tags().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
                Element::DenseNode(n) => (n.id(), n.lat(), n.lon(), n.tags().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
                _ => return,
            };
            nodes.lock().unwrap().insert(id, RawNode { lat, lon, tags: tags.into_iter().collect() });
        })
        .map_err(IngestError::Read)?;

    Ok(nodes.into_inner().unwrap())
}

fn extract_ways<P: AsRef<Path>>(path: P) -> Result<Vec<RawWay>, IngestError> {
    let path = path.as_ref();
    let reader = ElementReader::from_path(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let ways = Mutex::new(Vec::new());
    reader
        .for_each(|element| {
            if let Element::Way(way) = element {
                let refs: Vec<i64> = way.refs().collect();
                let tags: HashMap<String, String> = way.tags().map(|(k, v)| (k.to_string(), v.to_string())).collect();
                ways.lock().unwrap().push(RawWay { id: way.id(), refs, tags });
            }
        })
        .map_err(IngestError::Read)?;

    let mut ways = ways.into_inner().unwrap();
    ways.sort_by_key(|w| w.id);
    Ok(ways)
}
