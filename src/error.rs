//! Core error types.
//!
//! The library boundary uses `thiserror` so callers can match on failure kind
//! (§7: input validation is tolerated, snap failure and no-route are reported
//! as empty results, invariant violations are fatal). The CLI boundary wraps
//! these in `anyhow` for human-readable context chains.

use thiserror::Error;

/// Fatal internal-invariant violations. These should never surface in normal
/// operation; if they do, it means corridorization or search produced data
/// that contradicts its own contract.
#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("chain {chain} references edge {edge} not present in the graph")]
    DanglingEdge { chain: String, edge: String },

    #[error("chain {chain} is discontinuous: edge {prev} ends at {prev_to} but edge {next} starts at {next_from}")]
    BrokenChain {
        chain: String,
        prev: String,
        prev_to: String,
        next: String,
        next_from: String,
    },

    #[error("corridor network adjacency is asymmetric: {a} lists {b} but not vice versa")]
    AsymmetricAdjacency { a: String, b: String },

    #[error("score {value} for {what} falls outside [0, 1]")]
    ScoreOutOfRange { what: String, value: f64 },
}

/// Errors that can occur while ingesting an OSM extract into a `Graph`.
///
/// Per §7, malformed individual elements (duplicate ids, dangling node
/// references) are not fatal: they're skipped and counted. Only an
/// unreadable input file is a hard error.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open PBF file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: osmpbf::Error,
    },

    #[error("failed to read PBF elements: {0}")]
    Read(#[from] osmpbf::Error),
}

pub type Result<T> = std::result::Result<T, InvariantError>;
