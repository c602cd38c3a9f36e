//! Greedy radius-based clustering of visit points.
//!
//! Single pass over the input: each point not yet claimed seeds a
//! candidate group of every unclaimed point within the radius. Groups
//! with at least [`MIN_CLUSTER_SIZE`] members become clusters and claim
//! their members. Results depend on input order.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::haversine::haversine_km;
use crate::model::{Coordinates, VisitPoint};

pub const MIN_CLUSTER_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    /// Mean of the member coordinates.
    pub centroid: Coordinates,
    pub radius_km: f64,
    /// Member ids, seed first, then in input order.
    pub members: Vec<String>,
    /// Members per square kilometre of the membership disc.
    pub density: f64,
    pub municipalities: Vec<String>,
    pub entity_types: Vec<String>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn from_members(members: &[&VisitPoint], radius_km: f64) -> Self {
        let n = members.len() as f64;
        let centroid = Coordinates::new(
            members.iter().map(|p| p.location.lat).sum::<f64>() / n,
            members.iter().map(|p| p.location.lng).sum::<f64>() / n,
        );
        Self {
            centroid,
            radius_km,
            members: members.iter().map(|p| p.id.clone()).collect(),
            density: n / (PI * radius_km * radius_km),
            municipalities: sorted_distinct(members.iter().map(|p| p.municipality.as_str())),
            entity_types: sorted_distinct(members.iter().map(|p| p.entity_type.as_str())),
        }
    }
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

pub fn detect(points: &[VisitPoint], radius_km: f64) -> Result<Vec<Cluster>> {
    if !(radius_km.is_finite() && radius_km > 0.0) {
        return Err(EngineError::InvalidRadius(radius_km));
    }
    if points.len() < 2 {
        return Ok(Vec::new());
    }

    let mut claimed = vec![false; points.len()];
    let mut clusters = Vec::new();

    for (seed_index, seed) in points.iter().enumerate() {
        if claimed[seed_index] {
            continue;
        }
        let group: Vec<usize> = std::iter::once(seed_index)
            .chain((0..points.len()).filter(|&j| {
                j != seed_index
                    && !claimed[j]
                    && haversine_km(seed.location, points[j].location) <= radius_km
            }))
            .collect();

        if group.len() >= MIN_CLUSTER_SIZE {
            let members: Vec<&VisitPoint> = group.iter().map(|&i| &points[i]).collect();
            clusters.push(Cluster::from_members(&members, radius_km));
            for i in group {
                claimed[i] = true;
            }
        }
    }

    debug!(points = points.len(), clusters = clusters.len(), radius_km, "detected clusters");
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, lat: f64, lng: f64, municipality: &str) -> VisitPoint {
        VisitPoint::new(id, id, (lat, lng), municipality)
    }

    #[test]
    fn test_four_close_points_form_one_cluster() {
        let points = vec![
            point("a", -26.9076, -48.6619, "Itajaí"),
            point("b", -26.9050, -48.6600, "Itajaí"),
            point("c", -26.9100, -48.6640, "Itajaí"),
            point("d", -26.9080, -48.6580, "Navegantes").with_entity_type("empresa_terceirizada"),
        ];
        let clusters = detect(&points, 5.0).unwrap();
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.len(), 4);
        assert_eq!(cluster.members, vec!["a", "b", "c", "d"]);
        assert_eq!(cluster.municipalities, vec!["Itajaí", "Navegantes"]);
        assert_eq!(cluster.entity_types, vec!["empresa_terceirizada", "prefeitura"]);
        assert!((cluster.density - 4.0 / (PI * 25.0)).abs() < 1e-12);
        assert!((cluster.centroid.lat - (-26.90765)).abs() < 1e-9);
    }

    #[test]
    fn test_pairs_are_not_clusters() {
        let points = vec![
            point("a", -26.90, -48.66, "Itajaí"),
            point("b", -26.90, -48.661, "Itajaí"),
            point("c", -27.50, -48.66, "Far"),
        ];
        assert!(detect(&points, 5.0).unwrap().is_empty());
    }

    #[test]
    fn test_claimed_points_do_not_seed_again() {
        // Two groups of three, 50 km apart
        let points = vec![
            point("a1", 0.0, 0.0, "A"),
            point("b1", 0.0, 0.45, "B"),
            point("a2", 0.0, 0.01, "A"),
            point("b2", 0.0, 0.46, "B"),
            point("a3", 0.0, 0.02, "A"),
            point("b3", 0.0, 0.47, "B"),
        ];
        let clusters = detect(&points, 5.0).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec!["a1", "a2", "a3"]);
        assert_eq!(clusters[1].members, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn test_too_few_points() {
        assert!(detect(&[], 5.0).unwrap().is_empty());
        assert!(detect(&[point("a", 0.0, 0.0, "A")], 5.0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_radius() {
        assert!(matches!(detect(&[], 0.0), Err(EngineError::InvalidRadius(_))));
        assert!(matches!(detect(&[], f64::NAN), Err(EngineError::InvalidRadius(_))));
    }
}
