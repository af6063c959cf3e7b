use serde::{Deserialize, Serialize};

/// A WGS84 point in decimal degrees.
///
/// Equality is an exact float compare (§3): two coordinates parsed from the
/// same source and never perturbed compare equal, which is what chain and
/// corridor endpoint matching relies on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Coordinate::new(lat, lng)
    }
}
