//! Great-circle distance and travel-time estimation.
//!
//! Uses straight-line distance on a spherical Earth and an assumed average
//! speed. Ignores the road network, which keeps the engine free of any
//! routing service.

use jiff::SignedDuration;

use crate::model::Coordinates;
use crate::traits::DistanceMatrixProvider;

/// Average driving speed for the surveyed region, local traffic included.
pub const DEFAULT_SPEED_KMH: f64 = 45.0;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in kilometers.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Converts distances into driving time at a constant average speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelTimeEstimator {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for TravelTimeEstimator {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl TravelTimeEstimator {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Driving time in hours for `km` kilometers.
    pub fn hours_for_km(&self, km: f64) -> f64 {
        km / self.speed_kmh
    }

    /// Driving time for `km` kilometers, rounded to the second.
    pub fn duration_for_km(&self, km: f64) -> SignedDuration {
        hours_to_duration(self.hours_for_km(km))
    }
}

/// Rounds fractional hours to a whole-second duration.
pub(crate) fn hours_to_duration(hours: f64) -> SignedDuration {
    SignedDuration::from_secs((hours * 3600.0).round() as i64)
}

/// Haversine-based distance matrix provider.
///
/// The default provider for route sequencing. Returns kilometers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineMatrix;

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<f64>> {
        let n = locations.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate().skip(i + 1) {
                let km = haversine_km(*from, *to);
                matrix[i][j] = km;
                matrix[j][i] = km;
            }
        }

        matrix
    }
}
