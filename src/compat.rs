//! Edge compatibility scoring (§4.B).
//!
//! A scalar in [0, 1] for whether the exit of edge `a` flows naturally into
//! the entry of edge `b`. Never a probability — only used as a
//! threshold-gated ordering during chain growth.

use crate::model::{EdgeAttributes, RoadClassGroup};

#[derive(Debug, Clone)]
pub struct CompatibilityOptions {
    pub allow_name_changes: bool,
    pub max_speed_difference_kmh: f64,
}

impl Default for CompatibilityOptions {
    fn default() -> Self {
        Self {
            allow_name_changes: true,
            max_speed_difference_kmh: 15.0,
        }
    }
}

// Component weights. They needn't sum to 1: the result is clamped, and the
// hard cuts dominate whenever they fire.
const W_ROAD_CLASS: f64 = 0.30;
const W_SURFACE: f64 = 0.20;
const W_INFRA: f64 = 0.20;
const W_NAME: f64 = 0.15;
const W_SPEED: f64 = 0.15;

/// `None` return means a hard cut fired: the edges can never belong to the
/// same chain regardless of everything else.
pub fn compatibility(a: &EdgeAttributes, b: &EdgeAttributes, opts: &CompatibilityOptions) -> f64 {
    if a.road_class.group() != b.road_class.group() {
        return 0.0;
    }

    if let (Some(sa), Some(sb)) = (a.speed_limit_kmh, b.speed_limit_kmh) {
        if (sa - sb).abs() > opts.max_speed_difference_kmh {
            return 0.0;
        }
    }

    let road_class_score = if a.road_class == b.road_class { 1.0 } else { 0.5 };
    let surface_score = surface_compat(a, b);
    let infra_score = infra_compat(a, b);
    let name_score = name_compat(a, b, opts.allow_name_changes);
    let speed_score = speed_compat(a, b);

    let total = W_ROAD_CLASS * road_class_score
        + W_SURFACE * surface_score
        + W_INFRA * infra_score
        + W_NAME * name_score
        + W_SPEED * speed_score;

    total.clamp(0.0, 1.0)
}

fn surface_compat(a: &EdgeAttributes, b: &EdgeAttributes) -> f64 {
    use crate::model::Surface::*;
    match (a.surface.surface, b.surface.surface) {
        (x, y) if x == y => 1.0,
        (Unknown, _) | (_, Unknown) => 0.6,
        (Paved, Unpaved) | (Unpaved, Paved) => 0.3,
    }
}

fn infra_compat(a: &EdgeAttributes, b: &EdgeAttributes) -> f64 {
    let ia = &a.infrastructure;
    let ib = &b.infrastructure;
    let flags = [
        ia.has_bicycle_infra == ib.has_bicycle_infra,
        ia.has_pedestrian_path == ib.has_pedestrian_path,
        ia.has_shoulder == ib.has_shoulder,
        ia.is_separated == ib.is_separated,
        ia.has_traffic_calming == ib.has_traffic_calming,
    ];
    flags.iter().filter(|m| **m).count() as f64 / flags.len() as f64
}

fn name_compat(a: &EdgeAttributes, b: &EdgeAttributes, allow_name_changes: bool) -> f64 {
    match (&a.name, &b.name) {
        (None, None) => 1.0,
        (Some(na), Some(nb)) if na == nb => 1.0,
        (Some(_), Some(_)) => {
            if allow_name_changes {
                0.5
            } else {
                0.1
            }
        }
        _ => 0.6,
    }
}

fn speed_compat(a: &EdgeAttributes, b: &EdgeAttributes) -> f64 {
    match (a.speed_limit_kmh, b.speed_limit_kmh) {
        (Some(_), Some(_)) => 1.0, // hard cut above already ruled out the incompatible case
        _ => 0.7,
    }
}
