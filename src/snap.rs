//! Start-coordinate snapping (§4.I): nearest search-graph node by an
//! rstar R-tree, preferring well-connected nodes within a radius so a loop
//! doesn't start by immediately dead-ending.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geo::haversine_distance;
use crate::model::{Coordinate, NodeId, SearchGraph};

#[derive(Debug, Clone)]
struct IndexedNode {
    node_id: NodeId,
    coordinate: Coordinate,
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.coordinate.lng, self.coordinate.lat])
    }
}

impl PointDistance for IndexedNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coordinate.lng - point[0];
        let dy = self.coordinate.lat - point[1];
        dx * dx + dy * dy
    }
}

pub struct SnapIndex {
    tree: RTree<IndexedNode>,
}

/// Nodes with fewer than this many search-graph edges are treated as
/// poorly connected and only chosen if nothing better is in range.
const MIN_WELL_CONNECTED_DEGREE: usize = 2;
/// Radius (metres) within which a well-connected node is preferred over
/// the strict nearest neighbor.
const PREFERENCE_RADIUS_M: f64 = 150.0;
/// Maximum distance (metres) the strict-nearest node may sit from the query
/// point before snapping gives up and returns `None` (§4.I).
const MAX_SNAP_RADIUS_M: f64 = 5_000.0;

impl SnapIndex {
    pub fn build(graph: &SearchGraph) -> Self {
        let nodes: Vec<IndexedNode> = graph
            .node_coordinates
            .iter()
            .map(|(id, coord)| IndexedNode { node_id: id.clone(), coordinate: *coord })
            .collect();
        Self { tree: RTree::bulk_load(nodes) }
    }

    /// Returns the node id to start the search from, or `None` if the
    /// search graph has no nodes at all, or the closest one still sits
    /// beyond `MAX_SNAP_RADIUS_M`.
    pub fn snap(&self, graph: &SearchGraph, point: Coordinate) -> Option<NodeId> {
        let query = [point.lng, point.lat];
        let mut candidates = self.tree.nearest_neighbor_iter(&query);

        let nearest = candidates.next()?;
        let nearest_dist = haversine_distance(nearest.coordinate, point);

        if nearest_dist > MAX_SNAP_RADIUS_M {
            return None;
        }

        if graph.outgoing(&nearest.node_id).len() >= MIN_WELL_CONNECTED_DEGREE {
            return Some(nearest.node_id.clone());
        }

        // The strict-nearest node is poorly connected; look a bit further
        // for one that isn't, within the preference radius.
        let mut best = nearest;
        let mut best_dist = nearest_dist;
        for candidate in candidates {
            let dist = haversine_distance(candidate.coordinate, point);
            if dist > PREFERENCE_RADIUS_M {
                break;
            }
            if graph.outgoing(&candidate.node_id).len() >= MIN_WELL_CONNECTED_DEGREE {
                return Some(candidate.node_id.clone());
            }
            if dist < best_dist {
                best = candidate;
                best_dist = dist;
            }
        }

        Some(best.node_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SearchEdge, SearchEdgeKind};

    fn edge(target: &str) -> SearchEdge {
        SearchEdge {
            graph_edge_id: "e".into(),
            corridor_id: "c".into(),
            kind: SearchEdgeKind::Corridor,
            target_node_id: target.into(),
            length_meters: 100.0,
            score: 0.8,
        }
    }

    #[test]
    fn snaps_to_the_nearest_well_connected_node() {
        let mut graph = SearchGraph::new();
        graph.node_coordinates.insert("isolated".into(), Coordinate::new(45.0, 0.0));
        graph.node_coordinates.insert("hub".into(), Coordinate::new(45.0, 0.002));
        graph.adjacency.insert("hub".into(), vec![edge("a"), edge("b")]);

        let index = SnapIndex::build(&graph);
        let snapped = index.snap(&graph, Coordinate::new(45.0, 0.0001)).unwrap();
        assert_eq!(snapped, "hub");
    }

    #[test]
    fn falls_back_to_nearest_when_nothing_well_connected_is_in_range() {
        let mut graph = SearchGraph::new();
        graph.node_coordinates.insert("only".into(), Coordinate::new(45.0, 0.0));

        let index = SnapIndex::build(&graph);
        let snapped = index.snap(&graph, Coordinate::new(45.0, 0.0001)).unwrap();
        assert_eq!(snapped, "only");
    }

    #[test]
    fn returns_none_when_nothing_is_within_the_max_radius() {
        let mut graph = SearchGraph::new();
        graph.node_coordinates.insert("only".into(), Coordinate::new(45.0, 0.0));

        let index = SnapIndex::build(&graph);
        // ~1.1 degrees of latitude, well beyond MAX_SNAP_RADIUS_M.
        assert!(index.snap(&graph, Coordinate::new(46.0, 0.0)).is_none());
    }
}
