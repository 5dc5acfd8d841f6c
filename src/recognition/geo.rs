//! Geolocation pre-filter on vote candidates.

use serde::Deserialize;
use tracing::debug;

use super::votes::Candidate;
use crate::library::GeoPoint;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeoFilterConfig {
    pub enabled: bool,
    /// Candidates farther than this from the query are dropped, meters.
    pub radius_m: f64,
}

impl Default for GeoFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius_m: 50.0,
        }
    }
}

/// Great-circle distance in meters (haversine).
pub fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Drop candidates located farther than the radius from the query.
///
/// Missing location on either side never excludes a candidate. Vote counts
/// are left untouched.
pub fn retain_nearby(candidates: &mut Vec<Candidate>, query: Option<GeoPoint>, config: &GeoFilterConfig) {
    if !config.enabled {
        return;
    }
    let Some(query) = query else {
        debug!("query has no location, geo filter skipped");
        return;
    };

    candidates.retain(|c| match c.location {
        None => {
            debug!(reference = %c.handle, "reference has no location, kept");
            true
        }
        Some(location) => {
            let distance = haversine_distance_m(query, location);
            let keep = distance <= config.radius_m;
            if !keep {
                debug!(reference = %c.handle, distance_m = distance, "dropped by geo filter");
            }
            keep
        }
    });
}
