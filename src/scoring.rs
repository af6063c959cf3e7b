//! Per-activity corridor scoring (§4.G): flow/safety/surface/character/
//! scenic/elevation sub-scores rolled into a clamped overall score, with a
//! layered JSON parameter-override system (see `config`).

use crate::config::ActivityScoringParams;
use crate::model::{Activity, ActivityScoreBreakdown, Corridor, CorridorType, RoadClass, Surface};

const FLOW_LENGTH_REFERENCE_M: f64 = 10_000.0;
const FLOW_LENGTH_SCALE_M: f64 = 300.0;

/// `0.6 · log(1 + len/300) / log(1 + 10000/300)` (capped at 1) +
/// `0.4 · exp(-0.2 · stopDensityPerKm)`; blend weight and decay are
/// activity-tunable (§4.G).
fn flow_score(corridor: &Corridor, params: &ActivityScoringParams) -> f64 {
    let a = &corridor.attributes;
    let length_term = ((1.0 + a.length_meters / FLOW_LENGTH_SCALE_M).ln()
        / (1.0 + FLOW_LENGTH_REFERENCE_M / FLOW_LENGTH_SCALE_M).ln())
    .min(1.0);
    let stop_term = (-params.flow_stop_decay * a.stop_density_per_km).exp();
    (params.flow_log_weight * length_term + (1.0 - params.flow_log_weight) * stop_term).clamp(0.0, 1.0)
}

fn speed_score(speed_limit_kmh: Option<f64>) -> f64 {
    match speed_limit_kmh {
        None => 0.5,
        Some(s) if s <= 30.0 => 1.0,
        Some(s) if s <= 40.0 => 0.8,
        Some(s) if s <= 50.0 => 0.6,
        Some(s) if s <= 60.0 => 0.3,
        Some(s) if s <= 80.0 => 0.1,
        Some(_) => 0.1,
    }
}

fn road_class_score(road_class: RoadClass) -> f64 {
    use RoadClass::*;
    match road_class {
        Cycleway | Path | Footway => 1.0,
        Residential | Service | Unclassified => 0.8,
        Tertiary | Track => 0.6,
        Secondary => 0.4,
        Primary => 0.2,
        Trunk | Motorway => 0.0,
    }
}

/// `0.3·bicycleInfraContinuity + 0.3·separationContinuity +
/// 0.2·speedScore + 0.2·roadClassScore` (§4.G, fixed weights).
fn safety_score(corridor: &Corridor) -> f64 {
    let a = &corridor.attributes;
    (0.3 * a.bicycle_infra_continuity
        + 0.3 * a.separation_continuity
        + 0.2 * speed_score(a.average_speed_limit)
        + 0.2 * road_class_score(a.predominant_road_class))
    .clamp(0.0, 1.0)
}

/// Table lookup per activity (`paved_preference` for paved, its complement
/// for unpaved, 0.5 for unknown), multiplied by `(0.5 + 0.5·surfaceConfidence)`.
/// Road cycling's `paved_preference = 1.0` makes unpaved score exactly 0.0
/// regardless of confidence — an effective disqualification (§4.G).
fn surface_score(corridor: &Corridor, params: &ActivityScoringParams) -> f64 {
    let a = &corridor.attributes;
    let table = match a.predominant_surface {
        Surface::Paved => params.paved_preference,
        Surface::Unpaved => 1.0 - params.paved_preference,
        Surface::Unknown => 0.5,
    };
    (table * (0.5 + 0.5 * a.surface_confidence)).clamp(0.0, 1.0)
}

/// Fixed table keyed by `CorridorType`, per activity (§4.G).
fn character_score(corridor: &Corridor, activity: Activity) -> f64 {
    use CorridorType::*;
    match activity {
        Activity::RoadCycling => match corridor.corridor_type {
            Arterial => 0.5,
            Collector => 0.8,
            Neighborhood | RuralRoad => 0.9,
            Trail => 0.2,
            Path => 0.3,
            Mixed => 0.5,
        },
        Activity::GravelCycling => match corridor.corridor_type {
            Trail => 1.0,
            Path => 0.8,
            RuralRoad => 0.9,
            Neighborhood => 0.6,
            Collector => 0.4,
            Arterial => 0.1,
            Mixed => 0.5,
        },
        Activity::Running => match corridor.corridor_type {
            Trail => 1.0,
            Path => 0.9,
            Neighborhood | RuralRoad => 0.7,
            Collector => 0.4,
            Arterial => 0.1,
            Mixed => 0.5,
        },
        Activity::Walking => match corridor.corridor_type {
            Trail | Path => 1.0,
            Neighborhood => 0.7,
            RuralRoad => 0.6,
            Collector => 0.3,
            Arterial => 0.0,
            Mixed => 0.5,
        },
    }
}

fn scenic_score(corridor: &Corridor) -> f64 {
    corridor.attributes.scenic_score
}

fn elevation_score(corridor: &Corridor, params: &ActivityScoringParams) -> f64 {
    match &corridor.attributes.elevation {
        None => 0.5,
        Some(rollup) => {
            let normalized = (rollup.hilliness_index / 30.0).min(1.0);
            if params.prefers_hills {
                normalized
            } else {
                1.0 - normalized
            }
        }
    }
}

/// Computes the full score breakdown for one corridor under one activity's
/// parameters. The overall score is a weighted sum of sub-scores, clamped
/// to `[0, 1]` (§4.G).
pub fn score_corridor(corridor: &Corridor, activity: Activity, params: &ActivityScoringParams) -> ActivityScoreBreakdown {
    let flow = flow_score(corridor, params);
    let safety = safety_score(corridor);
    let surface = surface_score(corridor, params);
    let character = character_score(corridor, activity);
    let scenic = scenic_score(corridor);
    let elevation = elevation_score(corridor, params);

    let overall = (params.weight_flow * flow
        + params.weight_safety * safety
        + params.weight_surface * surface
        + params.weight_character * character
        + params.weight_scenic * scenic
        + params.weight_elevation * elevation)
        .clamp(0.0, 1.0);

    ActivityScoreBreakdown {
        overall,
        flow,
        safety,
        surface,
        character,
        scenic,
        elevation,
    }
}

/// Scores every corridor in place, in parallel, for every requested
/// activity (§4.G: scoring runs independently per corridor).
pub fn score_all_corridors(
    network: &mut crate::model::CorridorNetwork,
    activities: &[Activity],
    profile: &crate::config::ScoringProfile,
) {
    use rayon::prelude::*;

    let corridor_ids: Vec<String> = network.corridors.keys().cloned().collect();
    let scored: Vec<(String, std::collections::HashMap<Activity, ActivityScoreBreakdown>)> = corridor_ids
        .par_iter()
        .map(|id| {
            let corridor = network.corridors.get(id).unwrap();
            let mut scores = std::collections::HashMap::new();
            for activity in activities {
                let params = profile.params_for(*activity);
                scores.insert(*activity, score_corridor(corridor, *activity, &params));
            }
            (id.clone(), scores)
        })
        .collect();

    for (id, scores) in scored {
        if let Some(corridor) = network.corridors.get_mut(&id) {
            corridor.scores = scores;
        }
    }
}
