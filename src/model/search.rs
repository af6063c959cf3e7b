//! The flattened, scored search graph and the live beam-search candidate
//! state (§3: SearchEdge, SearchGraph, SearchCandidate).

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::graph::{EdgeId, NodeId};
use super::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchEdgeKind {
    Corridor,
    Connector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEdge {
    pub graph_edge_id: EdgeId,
    pub corridor_id: String,
    pub kind: SearchEdgeKind,
    pub target_node_id: NodeId,
    pub length_meters: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchGraph {
    pub adjacency: IndexMap<NodeId, Vec<SearchEdge>>,
    pub node_coordinates: IndexMap<NodeId, Coordinate>,
}

impl SearchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outgoing(&self, node_id: &str) -> &[SearchEdge] {
        self.adjacency.get(node_id).map_or(&[], |v| v.as_slice())
    }

    pub fn coordinate_of(&self, node_id: &str) -> Option<Coordinate> {
        self.node_coordinates.get(node_id).copied()
    }
}

/// Live beam-search state. Not serialized: candidates live only within one
/// `generate_loops` call (§3 Lifecycle & ownership).
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub edge_path: Vec<EdgeId>,
    pub corridor_path: Vec<String>,
    pub node_path: Vec<NodeId>,
    pub current_node_id: NodeId,
    pub distance_so_far: f64,
    pub weighted_score_sum: f64,
    pub corridor_distance: f64,
    pub connector_penalty_sum: f64,
    pub visited_edges: FxHashSet<EdgeId>,
    pub last_edge_score: f64,
}

impl SearchCandidate {
    pub fn start(node_id: NodeId) -> Self {
        Self {
            edge_path: Vec::new(),
            corridor_path: Vec::new(),
            node_path: vec![node_id.clone()],
            current_node_id: node_id,
            distance_so_far: 0.0,
            weighted_score_sum: 0.0,
            corridor_distance: 0.0,
            connector_penalty_sum: 0.0,
            visited_edges: FxHashSet::default(),
            last_edge_score: 1.0,
        }
    }

    pub fn avg_corridor_score(&self) -> f64 {
        if self.corridor_distance > 0.0 {
            self.weighted_score_sum / self.corridor_distance
        } else {
            0.5
        }
    }
}
