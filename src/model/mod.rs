//! Data model (§3): the typed routing graph, chains, corridors/connectors,
//! and the flattened search graph.

pub mod activity;
pub mod chain;
pub mod coordinate;
pub mod corridor;
pub mod graph;
pub mod search;

pub use activity::Activity;
pub use chain::EdgeChain;
pub use coordinate::Coordinate;
pub use corridor::{
    ActivityScoreBreakdown, Connector, ConnectorAttributes, Corridor, CorridorAttributes,
    CorridorNetwork, CorridorType, ElevationRollup,
};
pub use graph::{
    EdgeAttributes, EdgeId, Enrichment, Graph, GraphEdge, GraphNode, Infrastructure, NodeId,
    RoadClass, RoadClassGroup, Surface, SurfaceClassification,
};
pub use search::{SearchCandidate, SearchEdge, SearchEdgeKind, SearchGraph};
