use serde::{Deserialize, Serialize};

/// A single geolocation sample, or the session's belief about "no recent
/// fix" once the refresh timestamp exceeds `patience` (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}
