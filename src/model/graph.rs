//! The typed routing graph (§3: GraphNode, GraphEdge, EdgeAttributes, Graph).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Unclassified,
    Service,
    Cycleway,
    Path,
    Footway,
    Track,
}

impl RoadClass {
    /// The compatibility "group" used for the hard cut in §4.B.
    pub fn group(self) -> RoadClassGroup {
        use RoadClass::*;
        match self {
            Cycleway | Path | Footway => RoadClassGroup::ActivePath,
            Residential | Unclassified | Service => RoadClassGroup::LocalStreet,
            Tertiary | Secondary | Primary | Trunk | Motorway => RoadClassGroup::ThroughRoad,
            Track => RoadClassGroup::Track,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClassGroup {
    ActivePath,
    LocalStreet,
    ThroughRoad,
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Paved,
    Unpaved,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SurfaceClassification {
    pub surface: Surface,
    pub confidence: f64,
    pub has_conflict: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Infrastructure {
    pub has_bicycle_infra: bool,
    pub has_pedestrian_path: bool,
    pub has_shoulder: bool,
    pub is_separated: bool,
    pub has_traffic_calming: bool,
}

/// Per-source enrichment confidences (street-imagery classifiers, DEM
/// providers). The core treats these as opaque provenance; only the already
/// resolved `SurfaceClassification`/`elevation*` fields feed the algorithms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enrichment {
    pub source_confidences: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeAttributes {
    pub road_class: RoadClass,
    pub surface: SurfaceClassification,
    pub infrastructure: Infrastructure,
    pub one_way: bool,
    pub length_meters: f64,
    pub name: Option<String>,
    pub speed_limit_kmh: Option<f64>,
    pub lanes: Option<u32>,
    pub stop_sign_count: Option<u32>,
    pub traffic_signal_count: Option<u32>,
    pub road_crossing_count: Option<u32>,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    pub average_grade: Option<f64>,
    pub max_grade: Option<f64>,
    pub scenic_designation: bool,
    pub enrichment: Option<Enrichment>,
}

pub type NodeId = String;
pub type EdgeId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub coordinate: Coordinate,
    pub is_crossing: Option<bool>,
    pub has_stop: Option<bool>,
    pub has_signal: Option<bool>,
    pub elevation_meters: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    /// Ordered vertices; first = `from_node_id`'s coordinate, last = `to_node_id`'s. len ≥ 2.
    pub geometry: Vec<Coordinate>,
    pub attributes: EdgeAttributes,
}

impl GraphEdge {
    /// The counterpart of `"X:f"` is `"X:r"` and vice versa; edges without
    /// the suffix are true one-ways with no counterpart (§3).
    pub fn counterpart_id(&self) -> Option<EdgeId> {
        if let Some(prefix) = self.id.strip_suffix(":f") {
            Some(format!("{prefix}:r"))
        } else {
            self.id.strip_suffix(":r").map(|prefix| format!("{prefix}:f"))
        }
    }
}

/// Nodes and edges keyed by stable string id, plus forward adjacency.
///
/// Built once by ingest and read-only thereafter (§3 Lifecycle & ownership).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: IndexMap<NodeId, GraphNode>,
    pub edges: IndexMap<EdgeId, GraphEdge>,
    /// fromNodeId -> ordered outgoing edge ids.
    pub adjacency: IndexMap<NodeId, Vec<EdgeId>>,
    /// toNodeId -> ordered incoming edge ids (reverse adjacency; used by the
    /// chain builder's backward growth, §4.C).
    pub reverse_adjacency: IndexMap<NodeId, Vec<EdgeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node and edge; the caller (ingest) is responsible for
    /// skipping malformed elements before they reach here. Returns `false`
    /// if `edge`'s endpoints aren't both already present, which the caller
    /// should treat as an input-validation skip (§7).
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if !self.nodes.contains_key(&edge.from_node_id) || !self.nodes.contains_key(&edge.to_node_id) {
            return false;
        }
        if self.edges.contains_key(&edge.id) {
            return false;
        }
        self.adjacency
            .entry(edge.from_node_id.clone())
            .or_default()
            .push(edge.id.clone());
        self.reverse_adjacency
            .entry(edge.to_node_id.clone())
            .or_default()
            .push(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn out_degree(&self, node_id: &str) -> usize {
        self.adjacency.get(node_id).map_or(0, |v| v.len())
    }

    pub fn outgoing_edges(&self, node_id: &str) -> &[EdgeId] {
        self.adjacency.get(node_id).map_or(&[], |v| v.as_slice())
    }

    pub fn incoming_edges(&self, node_id: &str) -> &[EdgeId] {
        self.reverse_adjacency.get(node_id).map_or(&[], |v| v.as_slice())
    }
}
