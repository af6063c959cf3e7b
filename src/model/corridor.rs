//! Corridors, connectors and the network that relates them (§3, §4.F/§4.G).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::activity::Activity;
use super::graph::{EdgeId, NodeId, RoadClass};
use super::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorridorType {
    Trail,
    Path,
    Neighborhood,
    RuralRoad,
    Collector,
    Arterial,
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationRollup {
    pub total_elevation_gain: f64,
    pub total_elevation_loss: f64,
    pub average_grade: f64,
    pub max_grade: f64,
    /// Resampled at ≈50m spacing along the geometry (§4.D).
    pub elevation_profile: Vec<f64>,
    pub hilliness_index: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorridorAttributes {
    pub length_meters: f64,
    pub predominant_road_class: RoadClass,
    pub predominant_surface: super::graph::Surface,
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
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityScoreBreakdown {
    pub overall: f64,
    pub flow: f64,
    pub safety: f64,
    pub surface: f64,
    pub character: f64,
    pub scenic: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corridor {
    pub id: String,
    pub name: Option<String>,
    pub corridor_type: CorridorType,
    pub attributes: CorridorAttributes,
    pub edge_ids: Vec<EdgeId>,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub geometry: Vec<Coordinate>,
    pub one_way: bool,
    pub scores: HashMap<Activity, ActivityScoreBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorAttributes {
    pub length_meters: f64,
    pub crosses_major_road: bool,
    pub has_signal: bool,
    pub has_stop: bool,
    pub crossing_difficulty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub edge_ids: Vec<EdgeId>,
    pub corridor_ids: Vec<String>,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub attributes: ConnectorAttributes,
    pub geometry: Vec<Coordinate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorridorNetwork {
    pub corridors: IndexMap<String, Corridor>,
    pub connectors: IndexMap<String, Connector>,
    /// Symmetric: `b` is in `adjacency[a]` iff `a` is in `adjacency[b]` (§8).
    pub adjacency: IndexMap<String, Vec<String>>,
}

impl CorridorNetwork {
    pub fn new() -> Self {
        Self::default()
    }
}
