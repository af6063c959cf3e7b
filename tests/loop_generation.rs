//! End-to-end scenarios across ingest-free Graph fixtures (§8): a rectangular
//! loop closes, a dead-end service spur is pruned away, corridor-type
//! classification follows the ordered rule cascade, and a far-off start
//! coordinate still snaps to the nearest graph node.

use trailloop::model::{
    Coordinate, EdgeAttributes, Graph, GraphEdge, GraphNode, Infrastructure, RoadClass, Surface,
    SurfaceClassification,
};
use trailloop::{build_corridors, generate_loop_routes, BuildCorridorsOptions, GenerateLoopRoutesOptions};

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

fn attrs(road_class: RoadClass, name: &str, length_meters: f64) -> EdgeAttributes {
    EdgeAttributes {
        road_class,
        surface: SurfaceClassification { surface: Surface::Paved, confidence: 1.0, has_conflict: false },
        infrastructure: Infrastructure::default(),
        one_way: false,
        length_meters,
        name: Some(name.to_string()),
        speed_limit_kmh: Some(40.0),
        lanes: Some(1),
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

/// Adds a two-way street between `a` and `b` as a straight line, producing
/// the `:f`/`:r` directed-edge pair.
fn add_two_way(graph: &mut Graph, id_stem: &str, a: &GraphNode, b: &GraphNode, road_class: RoadClass, name: &str) {
    let length = trailloop::geo::haversine_distance(a.coordinate, b.coordinate);
    graph.add_edge(GraphEdge {
        id: format!("{id_stem}:f"),
        from_node_id: a.id.clone(),
        to_node_id: b.id.clone(),
        geometry: vec![a.coordinate, b.coordinate],
        attributes: attrs(road_class, name, length),
    });
    graph.add_edge(GraphEdge {
        id: format!("{id_stem}:r"),
        from_node_id: b.id.clone(),
        to_node_id: a.id.clone(),
        geometry: vec![b.coordinate, a.coordinate],
        attributes: attrs(road_class, name, length),
    });
}

/// A ~2km-perimeter rectangle: nw -> ne -> se -> sw -> nw, each side a
/// distinct named residential street long enough to pass the corridor tier
/// gate. One degree-dependent parameter: a service dead-end spur off `se`
/// short enough, and the wrong class, to never qualify for destination
/// rescue (§4.C).
fn rectangle_graph() -> (Graph, GraphNode, GraphNode, GraphNode, GraphNode, GraphNode) {
    let mut graph = Graph::new();

    let nw = node("nw", 52.0000, 4.0000);
    let ne = node("ne", 52.0000, 4.0090);
    let se = node("se", 51.9955, 4.0090);
    let sw = node("sw", 51.9955, 4.0000);
    let spur = node("spur", 51.9950, 4.0095);

    for n in [&nw, &ne, &se, &sw, &spur] {
        graph.add_node(n.clone());
    }

    add_two_way(&mut graph, "north", &nw, &ne, RoadClass::Residential, "North Street");
    add_two_way(&mut graph, "east", &ne, &se, RoadClass::Residential, "East Street");
    add_two_way(&mut graph, "south", &se, &sw, RoadClass::Residential, "South Street");
    add_two_way(&mut graph, "west", &sw, &nw, RoadClass::Residential, "West Street");
    add_two_way(&mut graph, "spur", &se, &spur, RoadClass::Service, "Loading Bay");

    (graph, nw, ne, se, sw)
}

#[test]
fn rectangle_loop_closes_back_near_the_start() {
    let (graph, nw, _ne, _se, _sw) = rectangle_graph();
    let (network, stats) = build_corridors(&graph, &BuildCorridorsOptions::default()).expect("valid network");
    assert!(stats.corridors >= 4, "expected at least the four rectangle sides as corridors");

    let options = GenerateLoopRoutesOptions {
        start_coordinate: nw.coordinate,
        min_distance_meters: 1_200.0,
        max_distance_meters: 2_600.0,
        search: trailloop::beam::SearchParams::default(),
        seed: 7,
    };
    let alternatives = generate_loop_routes(&graph, &network, trailloop::model::Activity::Running, &options)
        .expect("start coordinate snaps onto the rectangle");

    assert!(!alternatives.routes.is_empty(), "expected at least one completed loop");
    for route in &alternatives.routes {
        assert!(route.stats.total_distance_m > 0.0);
        let first = route.geometry.first().expect("non-empty geometry");
        let last = route.geometry.last().expect("non-empty geometry");
        let closure_gap = trailloop::geo::haversine_distance(*first, *last);
        assert!(closure_gap < 200.0, "loop should close back near its start, gap was {closure_gap}m");
    }
}

#[test]
fn dead_end_service_spur_is_pruned_out_of_every_chain() {
    let (graph, ..) = rectangle_graph();
    let (network, _stats) = build_corridors(&graph, &BuildCorridorsOptions::default()).expect("valid network");

    let corridor_has_spur = network
        .corridors
        .values()
        .any(|corridor| corridor.edge_ids.iter().any(|id| id.starts_with("spur:")));
    assert!(!corridor_has_spur, "service dead-end spur must not survive into any corridor");

    let connector_has_spur = network
        .connectors
        .values()
        .any(|connector| connector.edge_ids.iter().any(|id| id.starts_with("spur:")));
    assert!(!connector_has_spur, "service dead-end spur must not survive into any connector either");
}

#[test]
fn no_revisit_holds_outside_the_home_zone() {
    let (graph, nw, _ne, _se, _sw) = rectangle_graph();
    let (network, _stats) = build_corridors(&graph, &BuildCorridorsOptions::default()).expect("valid network");
    let search_graph = trailloop::searchgraph::build_search_graph(&graph, &network, trailloop::model::Activity::Running);
    let index = trailloop::snap::SnapIndex::build(&search_graph);
    let start_node = index.snap(&search_graph, nw.coordinate).expect("snap succeeds");

    let mut params = trailloop::beam::SearchParams::default();
    params.target_distance_m = 1_800.0;
    params.tolerance_fraction = 0.3;
    params.seed = 11;

    let candidates = trailloop::beam::generate_loops(&search_graph, start_node, &params);
    for candidate in &candidates {
        trailloop::validate::check_no_revisit(candidate).expect("no edge visited twice");
    }
}

#[test]
fn classify_corridor_type_follows_the_ordered_cascade() {
    use trailloop::model::{CorridorAttributes, CorridorType, RoadClass, Surface};

    let mut attrs = CorridorAttributes {
        length_meters: 500.0,
        predominant_road_class: RoadClass::Path,
        predominant_surface: Surface::Unpaved,
        surface_confidence: 1.0,
        bicycle_infra_continuity: 0.0,
        pedestrian_path_continuity: 0.0,
        separation_continuity: 0.0,
        traffic_calming_continuity: 0.0,
        scenic_score: 0.0,
        average_speed_limit: None,
        stop_density_per_km: 0.0,
        crossing_density_per_km: 0.0,
        turns_count: 0,
        elevation: None,
        name: None,
        name_consistency: 0.0,
    };
    assert_eq!(trailloop::classify::classify_corridor_type(&attrs), CorridorType::Trail);

    attrs.predominant_road_class = RoadClass::Primary;
    attrs.predominant_surface = Surface::Paved;
    assert_eq!(trailloop::classify::classify_corridor_type(&attrs), CorridorType::Arterial);

    attrs.predominant_road_class = RoadClass::Unclassified;
    attrs.stop_density_per_km = 0.1;
    attrs.crossing_density_per_km = 0.1;
    assert_eq!(trailloop::classify::classify_corridor_type(&attrs), CorridorType::RuralRoad);
}

#[test]
fn snap_from_far_off_start_returns_none() {
    let (graph, ..) = rectangle_graph();
    let (network, _stats) = build_corridors(&graph, &BuildCorridorsOptions::default()).expect("valid network");
    let search_graph = trailloop::searchgraph::build_search_graph(&graph, &network, trailloop::model::Activity::Walking);
    let index = trailloop::snap::SnapIndex::build(&search_graph);

    // Several kilometers north of the rectangle; nothing within snap radius.
    let far_away = Coordinate::new(52.2000, 4.0000);
    assert!(index.snap(&search_graph, far_away).is_none(), "start far outside the radius must not snap");
}
