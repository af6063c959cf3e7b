//! Chain-tier and corridor-type classification (§4.E/§4.G).

use crate::compat::{compatibility, CompatibilityOptions};
use crate::model::{CorridorAttributes, CorridorType, EdgeChain, EdgeId, Graph, RoadClass};

/// Tiered base-length thresholds a chain is measured against before the
/// name-bonus and homogeneity-penalty adjustments (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct MinLengthByTier {
    pub dedicated_infra_m: f64,
    pub named_bike_infra_m: f64,
    pub named_road_m: f64,
    pub unnamed_m: f64,
}

impl Default for MinLengthByTier {
    fn default() -> Self {
        Self {
            dedicated_infra_m: 400.0,
            named_bike_infra_m: 800.0,
            named_road_m: 1609.0,
            unnamed_m: 1609.0,
        }
    }
}

fn base_tier_length(tiers: &MinLengthByTier, attrs: &CorridorAttributes) -> f64 {
    let is_dedicated_infra = attrs.predominant_road_class == RoadClass::Cycleway || attrs.separation_continuity > 0.0;
    if is_dedicated_infra {
        return tiers.dedicated_infra_m;
    }

    let is_named = attrs.name.is_some();
    if is_named && attrs.bicycle_infra_continuity > 0.0 {
        return tiers.named_bike_infra_m;
    }
    if is_named {
        return tiers.named_road_m;
    }
    tiers.unnamed_m
}

/// Mean pairwise compatibility across consecutive edges of the chain; a
/// single-edge chain is perfectly homogeneous by definition (§4.E).
fn chain_homogeneity(graph: &Graph, edge_ids: &[EdgeId], opts: &CompatibilityOptions) -> f64 {
    if edge_ids.len() < 2 {
        return 1.0;
    }
    let scores: Vec<f64> = edge_ids
        .windows(2)
        .map(|pair| {
            let a = &graph.edges.get(&pair[0]).unwrap().attributes;
            let b = &graph.edges.get(&pair[1]).unwrap().attributes;
            compatibility(a, b, opts)
        })
        .collect();
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Effective minimum length a chain must clear to become its own corridor:
/// tiered base threshold, halved on a strong name-consistency bonus,
/// inflated by `1/homogeneity` when the chain is heterogeneous (§4.E).
pub fn effective_minimum_length_meters(
    graph: &Graph,
    edge_ids: &[EdgeId],
    tiers: &MinLengthByTier,
    compat_opts: &CompatibilityOptions,
    attrs: &CorridorAttributes,
) -> f64 {
    let mut threshold = base_tier_length(tiers, attrs);

    if attrs.name.is_some() && attrs.name_consistency >= 0.8 {
        threshold /= 2.0;
    }

    let homogeneity = chain_homogeneity(graph, edge_ids, compat_opts);
    if homogeneity < 0.7 {
        threshold *= 1.0 / homogeneity.max(f64::EPSILON);
    }

    threshold
}

pub fn chain_passes_tier(
    graph: &Graph,
    chain: &EdgeChain,
    attrs: &CorridorAttributes,
    tiers: &MinLengthByTier,
    compat_opts: &CompatibilityOptions,
) -> bool {
    if chain.is_destination {
        return true;
    }
    attrs.length_meters >= effective_minimum_length_meters(graph, &chain.edge_ids, tiers, compat_opts, attrs)
}

/// Ordered rule cascade (§4.G): the first matching rule wins.
pub fn classify_corridor_type(attrs: &CorridorAttributes) -> CorridorType {
    use RoadClass::*;

    if matches!(attrs.predominant_road_class, Path | Track)
        || (attrs.predominant_road_class == Cycleway && attrs.predominant_surface == crate::model::Surface::Unpaved)
    {
        return CorridorType::Trail;
    }

    if matches!(attrs.predominant_road_class, Cycleway | Footway) {
        return CorridorType::Path;
    }

    if matches!(attrs.predominant_road_class, Primary | Trunk | Motorway) {
        return CorridorType::Arterial;
    }

    if attrs.predominant_road_class == Secondary
        || (attrs.predominant_road_class == Tertiary && attrs.average_speed_limit.unwrap_or(0.0) >= 50.0)
    {
        return CorridorType::Collector;
    }

    if matches!(attrs.predominant_road_class, Unclassified | Service)
        && attrs.stop_density_per_km < 2.0
        && attrs.crossing_density_per_km < 1.0
    {
        return CorridorType::RuralRoad;
    }

    if matches!(attrs.predominant_road_class, Residential | Tertiary | Unclassified) {
        return CorridorType::Neighborhood;
    }

    CorridorType::Mixed
}
