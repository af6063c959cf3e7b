//! Layered scoring-parameter configuration: built-in per-activity defaults,
//! overridable by a base JSON layer and then a per-activity JSON layer
//! (deep merge, later layers win field-by-field).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Activity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActivityScoringParams {
    pub weight_flow: f64,
    pub weight_safety: f64,
    pub weight_surface: f64,
    pub weight_character: f64,
    pub weight_scenic: f64,
    pub weight_elevation: f64,
    /// Blend weight of flow's log-length term; the stop-density decay term
    /// gets `1 - flow_log_weight` (§4.G).
    pub flow_log_weight: f64,
    /// Decay constant of flow's `exp(-k · stopDensityPerKm)` term.
    pub flow_stop_decay: f64,
    /// Table value for paved surface; unpaved gets `1 - paved_preference`.
    pub paved_preference: f64,
    pub prefers_hills: bool,
}

impl ActivityScoringParams {
    pub fn default_for(activity: Activity) -> Self {
        match activity {
            Activity::RoadCycling => Self {
                weight_flow: 0.25,
                weight_safety: 0.25,
                weight_surface: 0.15,
                weight_character: 0.15,
                weight_scenic: 0.10,
                weight_elevation: 0.10,
                flow_log_weight: 0.6,
                flow_stop_decay: 0.2,
                paved_preference: 1.0,
                prefers_hills: false,
            },
            Activity::GravelCycling => Self {
                weight_flow: 0.15,
                weight_safety: 0.15,
                weight_surface: 0.25,
                weight_character: 0.25,
                weight_scenic: 0.15,
                weight_elevation: 0.05,
                flow_log_weight: 0.6,
                flow_stop_decay: 0.2,
                paved_preference: 0.2,
                prefers_hills: true,
            },
            Activity::Running => Self {
                weight_flow: 0.15,
                weight_safety: 0.30,
                weight_surface: 0.15,
                weight_character: 0.20,
                weight_scenic: 0.15,
                weight_elevation: 0.05,
                flow_log_weight: 0.6,
                flow_stop_decay: 0.2,
                paved_preference: 0.3,
                prefers_hills: false,
            },
            Activity::Walking => Self {
                weight_flow: 0.10,
                weight_safety: 0.35,
                weight_surface: 0.15,
                weight_character: 0.20,
                weight_scenic: 0.20,
                weight_elevation: 0.0,
                flow_log_weight: 0.6,
                flow_stop_decay: 0.2,
                paved_preference: 0.6,
                prefers_hills: false,
            },
        }
    }

    fn apply_override(&mut self, o: &ActivityScoringParamsOverride) {
        macro_rules! over {
            ($field:ident) => {
                if let Some(v) = o.$field {
                    self.$field = v;
                }
            };
        }
        over!(weight_flow);
        over!(weight_safety);
        over!(weight_surface);
        over!(weight_character);
        over!(weight_scenic);
        over!(weight_elevation);
        over!(flow_log_weight);
        over!(flow_stop_decay);
        over!(paved_preference);
        over!(prefers_hills);
    }
}

/// A partial layer: every field optional, so a JSON document only needs to
/// name what it's changing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityScoringParamsOverride {
    pub weight_flow: Option<f64>,
    pub weight_safety: Option<f64>,
    pub weight_surface: Option<f64>,
    pub weight_character: Option<f64>,
    pub weight_scenic: Option<f64>,
    pub weight_elevation: Option<f64>,
    pub flow_log_weight: Option<f64>,
    pub flow_stop_decay: Option<f64>,
    pub paved_preference: Option<f64>,
    pub prefers_hills: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub base: ActivityScoringParamsOverride,
    #[serde(default)]
    pub activities: HashMap<String, ActivityScoringParamsOverride>,
}

impl ScoringConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Fully resolved parameters for every activity, ready for `scoring::score_corridor`.
#[derive(Debug, Clone)]
pub struct ScoringProfile {
    resolved: HashMap<Activity, ActivityScoringParams>,
}

impl ScoringProfile {
    pub fn from_config(config: &ScoringConfig) -> Self {
        let mut resolved = HashMap::new();
        for activity in Activity::ALL {
            let mut params = ActivityScoringParams::default_for(activity);
            params.apply_override(&config.base);
            if let Some(layer) = config.activities.get(activity.as_str()) {
                params.apply_override(layer);
            }
            resolved.insert(activity, params);
        }
        Self { resolved }
    }

    pub fn params_for(&self, activity: Activity) -> ActivityScoringParams {
        self.resolved
            .get(&activity)
            .copied()
            .unwrap_or_else(|| ActivityScoringParams::default_for(activity))
    }
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}
