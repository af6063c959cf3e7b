//! Raw chain output of the greedy walk (§3: EdgeChain, §4.C).

use serde::{Deserialize, Serialize};

use super::graph::{EdgeId, NodeId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeChain {
    pub edge_ids: Vec<EdgeId>,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub total_length_meters: f64,
    /// Set by the 2-core pruning pass (§4.C) when this chain survives only
    /// because it qualifies as a destination chain; bypasses subsequent
    /// length gates in the classifier (§4.E).
    pub is_destination: bool,
}

impl EdgeChain {
    pub fn single(edge_id: EdgeId, from: NodeId, to: NodeId, length: f64) -> Self {
        Self {
            edge_ids: vec![edge_id],
            start_node_id: from,
            end_node_id: to,
            total_length_meters: length,
            is_destination: false,
        }
    }
}
