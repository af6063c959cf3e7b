//! Length-weighted attribute aggregation (§4.D): rolls a chain's per-edge
//! attributes up into the `CorridorAttributes` a chain's eventual corridor
//! carries, plus the corridor's simplified geometry.

use indexmap::IndexMap;
use itertools::Itertools;

use crate::geo::{bearing_diff, douglas_peucker};
use crate::model::{
    Coordinate, ElevationRollup, EdgeId, Graph, RoadClass, Surface,
};

const TURN_ANGLE_THRESHOLD_DEG: f64 = 30.0;
const SIMPLIFY_TOLERANCE_M: f64 = 3.0;
const ELEVATION_SAMPLE_SPACING_M: f64 = 50.0;

pub struct AggregateOutput {
    pub length_meters: f64,
    pub predominant_road_class: RoadClass,
    pub predominant_surface: Surface,
    pub surface_confidence: f64,
    pub bicycle_infra_continuity: f64,
    pub pedestrian_path_continuity: f64,
    pub separation_continuity: f64,
    pub traffic_calming_continuity: f64,
    pub scenic_score: f64,
    pub average_speed_limit: Option<f64>,
    pub stop_density_per_km: f64,
    pub crossing_density_per_km: f64,
    pub turns_count: u32,
    pub elevation: Option<ElevationRollup>,
    pub name: Option<String>,
    pub name_consistency: f64,
    pub geometry: Vec<Coordinate>,
}

/// Length-weighted argmax over a per-edge key. Ties broken by first
/// occurrence in edge order, matching the rest of the pipeline's
/// determinism guarantee.
fn predominant<K: Eq + std::hash::Hash + Clone>(weights: &IndexMap<K, f64>) -> Option<K> {
    weights
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(k, _)| k.clone())
}

fn length_weighted_fraction<F: Fn(&crate::model::EdgeAttributes) -> bool>(
    graph: &Graph,
    edge_ids: &[EdgeId],
    total_length: f64,
    predicate: F,
) -> f64 {
    if total_length <= 0.0 {
        return 0.0;
    }
    let matched: f64 = edge_ids
        .iter()
        .map(|id| graph.edges.get(id).unwrap())
        .filter(|e| predicate(&e.attributes))
        .map(|e| e.attributes.length_meters)
        .sum();
    matched / total_length
}

fn concatenate_geometry(graph: &Graph, edge_ids: &[EdgeId]) -> Vec<Coordinate> {
    let mut points: Vec<Coordinate> = Vec::new();
    for (i, id) in edge_ids.iter().enumerate() {
        let edge = graph.edges.get(id).unwrap();
        if i == 0 {
            points.extend(edge.geometry.iter().copied());
        } else {
            points.extend(edge.geometry.iter().skip(1).copied());
        }
    }
    points
}

pub(crate) fn count_turns(graph: &Graph, edge_ids: &[EdgeId]) -> u32 {
    edge_ids
        .iter()
        .map(|id| graph.edges.get(id).unwrap())
        .tuple_windows()
        .filter(|(a, b)| {
            let exit = bearing(&a.geometry);
            let entry = bearing(&b.geometry);
            bearing_diff(exit, entry) > TURN_ANGLE_THRESHOLD_DEG
        })
        .count() as u32
}

fn bearing(geometry: &[Coordinate]) -> f64 {
    let n = geometry.len();
    crate::geo::bearing(geometry[n.saturating_sub(2)], geometry[n - 1])
}

/// Internal (non-endpoint) chain nodes where the underlying graph shows
/// out-degree > 2 are treated as real intersections, not pass-throughs
/// (§4.D: crossing density is topology-based).
fn crossing_count(graph: &Graph, edge_ids: &[EdgeId]) -> u32 {
    let mut count = 0;
    for id in &edge_ids[..edge_ids.len().saturating_sub(1)] {
        let edge = graph.edges.get(id).unwrap();
        if graph.out_degree(&edge.to_node_id) > 2 {
            count += 1;
        }
    }
    count
}

fn elevation_rollup(graph: &Graph, edge_ids: &[EdgeId], geometry: &[Coordinate], length_meters: f64) -> Option<ElevationRollup> {
    let mut total_gain = 0.0;
    let mut total_loss = 0.0;
    let mut grade_weight_sum = 0.0;
    let mut max_grade: f64 = 0.0;
    let mut any_elevation_data = false;

    for id in edge_ids {
        let e = graph.edges.get(id).unwrap();
        if let Some(gain) = e.attributes.elevation_gain {
            total_gain += gain;
            any_elevation_data = true;
        }
        if let Some(loss) = e.attributes.elevation_loss {
            total_loss += loss;
            any_elevation_data = true;
        }
        if let Some(grade) = e.attributes.average_grade {
            grade_weight_sum += grade * e.attributes.length_meters;
        }
        if let Some(g) = e.attributes.max_grade {
            max_grade = max_grade.max(g.abs());
        }
    }

    if !any_elevation_data {
        return None;
    }

    let average_grade = if length_meters > 0.0 {
        grade_weight_sum / length_meters
    } else {
        0.0
    };

    let elevation_profile = resample_elevation_profile(graph, edge_ids, geometry);

    let length_km = (length_meters / 1000.0).max(0.001);
    let hilliness_index = total_gain / length_km;

    Some(ElevationRollup {
        total_elevation_gain: total_gain,
        total_elevation_loss: total_loss,
        average_grade,
        max_grade,
        elevation_profile,
        hilliness_index,
    })
}

/// Linear interpolation of known node elevations along the concatenated
/// geometry's cumulative distance, sampled every ~50m. Interior geometry
/// vertices (shape points with no corresponding graph node) carry no
/// elevation of their own.
fn resample_elevation_profile(graph: &Graph, edge_ids: &[EdgeId], geometry: &[Coordinate]) -> Vec<f64> {
    if geometry.len() < 2 {
        return Vec::new();
    }

    let mut breakpoints: Vec<(f64, f64)> = Vec::new();
    if let Some(first_id) = edge_ids.first() {
        let first = graph.edges.get(first_id).unwrap();
        if let Some(elev) = graph.nodes.get(&first.from_node_id).and_then(|n| n.elevation_meters) {
            breakpoints.push((0.0, elev));
        }
    }

    let mut running = 0.0;
    for id in edge_ids {
        let e = graph.edges.get(id).unwrap();
        running += e.attributes.length_meters;
        if let Some(elev) = graph.nodes.get(&e.to_node_id).and_then(|n| n.elevation_meters) {
            breakpoints.push((running, elev));
        }
    }

    if breakpoints.len() < 2 {
        return Vec::new();
    }
    breakpoints.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let total = running;
    let mut samples = Vec::new();
    let mut d = 0.0;
    while d <= total {
        samples.push(interpolate(&breakpoints, d));
        d += ELEVATION_SAMPLE_SPACING_M;
    }
    samples
}

fn interpolate(breakpoints: &[(f64, f64)], d: f64) -> f64 {
    if d <= breakpoints[0].0 {
        return breakpoints[0].1;
    }
    if d >= breakpoints[breakpoints.len() - 1].0 {
        return breakpoints[breakpoints.len() - 1].1;
    }
    for window in breakpoints.windows(2) {
        let (d0, e0) = window[0];
        let (d1, e1) = window[1];
        if d >= d0 && d <= d1 {
            if (d1 - d0).abs() < f64::EPSILON {
                return e0;
            }
            let t = (d - d0) / (d1 - d0);
            return e0 + t * (e1 - e0);
        }
    }
    breakpoints[breakpoints.len() - 1].1
}

/// Rolls up every attribute a corridor needs from its underlying chain's
/// edges. `edge_ids` must be non-empty and form a single connected chain.
pub fn aggregate_attributes(graph: &Graph, edge_ids: &[EdgeId]) -> AggregateOutput {
    let length_meters: f64 = edge_ids
        .iter()
        .map(|id| graph.edges.get(id).unwrap().attributes.length_meters)
        .sum();

    let mut road_class_weights: IndexMap<RoadClass, f64> = IndexMap::new();
    let mut surface_weights: IndexMap<Surface, f64> = IndexMap::new();
    let mut surface_confidence_weight_sum = 0.0;
    let mut speed_weight_sum = 0.0;
    let mut speed_length_sum = 0.0;
    let mut marker_count_sum: u32 = 0;
    let mut scenic_length = 0.0;
    let mut name_weights: IndexMap<Option<String>, f64> = IndexMap::new();

    for id in edge_ids {
        let edge = graph.edges.get(id).unwrap();
        let len = edge.attributes.length_meters;

        *road_class_weights.entry(edge.attributes.road_class).or_insert(0.0) += len;
        *surface_weights.entry(edge.attributes.surface.surface).or_insert(0.0) += len;
        surface_confidence_weight_sum += edge.attributes.surface.confidence * len;

        if let Some(speed) = edge.attributes.speed_limit_kmh {
            speed_weight_sum += speed * len;
            speed_length_sum += len;
        }
        marker_count_sum += edge.attributes.stop_sign_count.unwrap_or(0)
            + edge.attributes.traffic_signal_count.unwrap_or(0)
            + edge.attributes.road_crossing_count.unwrap_or(0);
        if edge.attributes.scenic_designation {
            scenic_length += len;
        }
        *name_weights.entry(edge.attributes.name.clone()).or_insert(0.0) += len;
    }

    let predominant_road_class = predominant(&road_class_weights).unwrap_or(RoadClass::Unclassified);
    let predominant_surface = predominant(&surface_weights).unwrap_or(Surface::Unknown);
    let surface_confidence = if length_meters > 0.0 {
        surface_confidence_weight_sum / length_meters
    } else {
        0.0
    };

    let bicycle_infra_continuity =
        length_weighted_fraction(graph, edge_ids, length_meters, |a| a.infrastructure.has_bicycle_infra);
    let pedestrian_path_continuity =
        length_weighted_fraction(graph, edge_ids, length_meters, |a| a.infrastructure.has_pedestrian_path);
    let separation_continuity =
        length_weighted_fraction(graph, edge_ids, length_meters, |a| a.infrastructure.is_separated);
    let traffic_calming_continuity =
        length_weighted_fraction(graph, edge_ids, length_meters, |a| a.infrastructure.has_traffic_calming);

    let scenic_score = if length_meters > 0.0 { scenic_length / length_meters } else { 0.0 };

    let average_speed_limit = if speed_length_sum > 0.0 {
        Some(speed_weight_sum / speed_length_sum)
    } else {
        None
    };

    let length_km = (length_meters / 1000.0).max(0.001);
    let stop_density_per_km = marker_count_sum as f64 / length_km;
    let crossing_density_per_km = crossing_count(graph, edge_ids) as f64 / length_km;
    let turns_count = count_turns(graph, edge_ids);

    let geometry = douglas_peucker(&concatenate_geometry(graph, edge_ids), SIMPLIFY_TOLERANCE_M);
    let elevation = elevation_rollup(graph, edge_ids, &geometry, length_meters);

    let predominant_name = predominant(&name_weights).unwrap_or(None);
    let name_consistency = if length_meters > 0.0 {
        name_weights.get(&predominant_name).copied().unwrap_or(0.0) / length_meters
    } else {
        0.0
    };

    AggregateOutput {
        length_meters,
        predominant_road_class,
        predominant_surface,
        surface_confidence,
        bicycle_infra_continuity,
        pedestrian_path_continuity,
        separation_continuity,
        traffic_calming_continuity,
        scenic_score,
        average_speed_limit,
        stop_density_per_km,
        crossing_density_per_km,
        turns_count,
        elevation,
        name: predominant_name,
        name_consistency,
        geometry,
    }
}
