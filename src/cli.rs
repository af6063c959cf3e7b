//! CLI driver (§6: "a driver that exercises the above is expected but not
//! specified here"). Thin: parses arguments, calls into the library, and
//! translates the result into one of the three documented exit codes.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::model::{Activity, Coordinate, CorridorNetwork, Graph};
use crate::{build_corridors, generate_loop_routes, BuildCorridorsOptions, GenerateLoopRoutesOptions};

#[derive(Parser)]
#[command(name = "trailloop")]
#[command(about = "Corridor-based loop route generation over OpenStreetMap street networks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest an OSM PBF extract and build a scored corridor network.
    BuildCorridors {
        /// Input .osm.pbf file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the bincode-encoded corridor network
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for the bincode-encoded routing graph the network
        /// was built from; `generate-routes` needs it to walk individual
        /// edges rather than whole corridors.
        #[arg(long)]
        graph_output: PathBuf,

        /// Optional layered scoring-parameter override JSON (§4.G, §9)
        #[arg(long)]
        scoring_config: Option<PathBuf>,
    },
    /// Generate loop route alternatives from a previously built network.
    GenerateRoutes {
        /// Corridor network file produced by `build-corridors`
        #[arg(short, long)]
        network: PathBuf,

        /// Routing graph file produced by `build-corridors --graph-output`
        #[arg(long)]
        graph: PathBuf,

        /// Start coordinate as "lat,lng"
        #[arg(long)]
        start: String,

        /// Activity: road-cycling, gravel-cycling, running, walking
        #[arg(long)]
        activity: Activity,

        /// Minimum loop distance in meters
        #[arg(long)]
        min_distance: f64,

        /// Maximum loop distance in meters
        #[arg(long)]
        max_distance: f64,

        /// PRNG seed for reproducible search (§5)
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Maximum number of alternative routes to return
        #[arg(long, default_value_t = 5)]
        max_routes: usize,

        /// Output JSON file for the generated routes
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Exit code contract from §6: 0 success, 1 no routes found, 2 bad input.
pub enum CliOutcome {
    Success,
    NoRoutes,
}

impl Cli {
    pub fn run(self) -> Result<CliOutcome> {
        match self.command {
            Commands::BuildCorridors { input, output, graph_output, scoring_config } => {
                run_build_corridors(input, output, graph_output, scoring_config)?;
                Ok(CliOutcome::Success)
            }
            Commands::GenerateRoutes { network, graph, start, activity, min_distance, max_distance, seed, max_routes, output } => {
                run_generate_routes(network, graph, &start, activity, min_distance, max_distance, seed, max_routes, output)
            }
        }
    }
}

fn run_build_corridors(input: PathBuf, output: PathBuf, graph_output: PathBuf, scoring_config: Option<PathBuf>) -> Result<()> {
    info!(input = %input.display(), "starting ingest");
    let (graph, ingest_stats) = crate::ingest::run_ingest(crate::ingest::IngestConfig { input })
        .context("failed to ingest OSM extract")?;
    info!(
        nodes = ingest_stats.nodes_parsed,
        ways = ingest_stats.ways_parsed,
        skipped = ingest_stats.ways_skipped,
        edges = ingest_stats.edges_created,
        "ingest complete"
    );

    let mut options = BuildCorridorsOptions::default();
    if let Some(path) = scoring_config {
        let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
        let config: crate::config::ScoringConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse scoring config {}", path.display()))?;
        options.scoring_profile = crate::config::ScoringProfile::from_config(&config);
    }

    let (network, stats) = build_corridors(&graph, &options).context("corridor network violates an internal invariant")?;
    info!(corridors = stats.corridors, connectors = stats.connectors, chains = stats.chains_built, "corridorization complete");

    let file = File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
    bincode::serialize_into(BufWriter::new(file), &network).context("failed to write corridor network")?;
    info!(output = %output.display(), "wrote corridor network");

    let graph_file = File::create(&graph_output).with_context(|| format!("failed to create {}", graph_output.display()))?;
    bincode::serialize_into(BufWriter::new(graph_file), &graph).context("failed to write routing graph")?;
    info!(output = %graph_output.display(), "wrote routing graph");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_generate_routes(
    network_path: PathBuf,
    graph_path: PathBuf,
    start: &str,
    activity: Activity,
    min_distance: f64,
    max_distance: f64,
    seed: u64,
    max_routes: usize,
    output: PathBuf,
) -> Result<CliOutcome> {
    let file = File::open(&network_path).with_context(|| format!("failed to open {}", network_path.display()))?;
    let network: CorridorNetwork = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("failed to parse corridor network {}", network_path.display()))?;

    let graph_file = File::open(&graph_path).with_context(|| format!("failed to open {}", graph_path.display()))?;
    let graph: Graph = bincode::deserialize_from(BufReader::new(graph_file))
        .with_context(|| format!("failed to parse routing graph {}", graph_path.display()))?;

    let start_coordinate = parse_coordinate(start)?;

    let mut search = crate::beam::SearchParams { max_routes, ..crate::beam::SearchParams::default() };
    search.seed = seed;

    let options = GenerateLoopRoutesOptions {
        start_coordinate,
        min_distance_meters: min_distance,
        max_distance_meters: max_distance,
        search,
        seed,
    };

    let Some(alternatives) = generate_loop_routes(&graph, &network, activity, &options) else {
        info!("start coordinate did not snap to the search graph");
        return Ok(CliOutcome::NoRoutes);
    };

    if alternatives.routes.is_empty() {
        info!("no completed routes found within the distance bounds");
        return Ok(CliOutcome::NoRoutes);
    }

    let file = File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &alternatives.routes).context("failed to write routes")?;
    info!(count = alternatives.routes.len(), output = %output.display(), "wrote routes");

    Ok(CliOutcome::Success)
}

fn parse_coordinate(raw: &str) -> Result<Coordinate> {
    let (lat, lng) = raw
        .split_once(',')
        .with_context(|| format!("coordinate '{raw}' must be 'lat,lng'"))?;
    Ok(Coordinate::new(
        lat.trim().parse().with_context(|| format!("invalid latitude in '{raw}'"))?,
        lng.trim().parse().with_context(|| format!("invalid longitude in '{raw}'"))?,
    ))
}
