//! trailloop: corridor-based loop route generation over OpenStreetMap
//! street networks.
//!
//! Pipeline:
//! - **Ingest** — parse an OSM PBF extract into a [`model::Graph`].
//! - **Corridorize** — [`chainbuild`] walks compatible directed edges into
//!   chains, [`aggregate`] rolls up their attributes, [`classify`] applies
//!   the tiered length gate, [`assemble`] promotes chains to corridors and
//!   connectors, [`scoring`] scores each corridor per activity.
//! - **Search** — [`searchgraph`] flattens the scored network per activity,
//!   [`snap`] maps a start coordinate to a graph node, [`beam`] runs the
//!   three-phase stochastic beam search, [`materialize`] converts a
//!   completed candidate into a displayable route.
//!
//! `buildCorridors`/`generateLoopRoutes` from the external interface are
//! [`build_corridors`] and [`generate_loop_routes`] below.

pub mod aggregate;
pub mod assemble;
pub mod beam;
pub mod chainbuild;
pub mod classify;
pub mod cli;
pub mod compat;
pub mod config;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod materialize;
pub mod model;
pub mod rng;
pub mod scoring;
pub mod searchgraph;
pub mod snap;
pub mod validate;

use model::{Activity, Coordinate, CorridorNetwork, Graph};

#[derive(Debug, Clone)]
pub struct BuildCorridorsOptions {
    pub chain: chainbuild::ChainBuildOptions,
    pub assemble: assemble::AssembleOptions,
    pub scoring_profile: config::ScoringProfile,
}

impl Default for BuildCorridorsOptions {
    fn default() -> Self {
        Self {
            chain: chainbuild::ChainBuildOptions::default(),
            assemble: assemble::AssembleOptions::default(),
            scoring_profile: config::ScoringProfile::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildCorridorsStats {
    pub chains_built: usize,
    pub corridors: usize,
    pub connectors: usize,
}

/// §6 downstream entry point: `buildCorridors(graph, options) -> { network, stats }`.
pub fn build_corridors(
    graph: &Graph,
    options: &BuildCorridorsOptions,
) -> Result<(CorridorNetwork, BuildCorridorsStats), error::InvariantError> {
    let unpruned_chains = chainbuild::build_chains(graph, &options.chain);
    let unpruned_edges: std::collections::HashSet<String> =
        unpruned_chains.iter().flat_map(|c| c.edge_ids.iter().cloned()).collect();
    let chains = chainbuild::prune_to_fixpoint(graph, unpruned_chains);
    let surviving_edges: std::collections::HashSet<&str> =
        chains.iter().flat_map(|c| c.edge_ids.iter().map(String::as_str)).collect();
    let pruned_edges: Vec<String> = unpruned_edges
        .into_iter()
        .filter(|id| !surviving_edges.contains(id.as_str()))
        .collect();

    let mut network = assemble::assemble_network(graph, chains.clone(), &options.assemble);
    scoring::score_all_corridors(&mut network, &Activity::ALL, &options.scoring_profile);

    validate::validate_network(graph, &chains, &network, &pruned_edges)?;

    let stats = BuildCorridorsStats {
        chains_built: chains.len(),
        corridors: network.corridors.len(),
        connectors: network.connectors.len(),
    };
    Ok((network, stats))
}

#[derive(Debug, Clone)]
pub struct GenerateLoopRoutesOptions {
    pub start_coordinate: Coordinate,
    pub min_distance_meters: f64,
    pub max_distance_meters: f64,
    pub search: beam::SearchParams,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct RouteAlternatives {
    pub routes: Vec<materialize::MaterializedRoute>,
}

/// §6 downstream entry point: `generateLoopRoutes(network, graph, activity,
/// options) -> RouteAlternatives | null`. Returns `None` when snap fails.
pub fn generate_loop_routes(
    graph: &Graph,
    network: &CorridorNetwork,
    activity: Activity,
    options: &GenerateLoopRoutesOptions,
) -> Option<RouteAlternatives> {
    let search_graph = searchgraph::build_search_graph(graph, network, activity);
    let index = snap::SnapIndex::build(&search_graph);
    let start_node = index.snap(&search_graph, options.start_coordinate)?;

    let target = (options.min_distance_meters + options.max_distance_meters) / 2.0;
    let mut params = options.search.clone();
    params.target_distance_m = target;
    params.tolerance_fraction = ((options.max_distance_meters - options.min_distance_meters) / 2.0 / target).max(0.01);
    params.seed = options.seed;

    let candidates = beam::generate_loops(&search_graph, start_node, &params);
    let routes = candidates
        .iter()
        .map(|c| materialize::materialize_route(c, graph, network))
        .collect();

    Some(RouteAlternatives { routes })
}
