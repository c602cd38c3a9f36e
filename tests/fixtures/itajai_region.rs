//! Real locations around the Itajaí microregion, Santa Catarina.
//!
//! Coordinates are town halls and utility offices taken from
//! OpenStreetMap, rounded to four decimal places.

#![allow(dead_code)]

use visit_route_planner::{Coordinates, Priority, VisitPoint};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub municipality: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, municipality: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            name,
            municipality,
            lat,
            lng,
        }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// A default visit (P2, 120 minutes) at this location.
    pub fn visit(&self, id: &str) -> VisitPoint {
        VisitPoint::new(id, self.name, self.coords(), self.municipality)
    }
}

pub const BASE: Location = Location::new("Agência IBGE Itajaí", "Itajaí", -26.9076, -48.6619);

// ============================================================================
// Town halls
// ============================================================================

pub const TOWN_HALLS: &[Location] = &[
    Location::new("Prefeitura de Itajaí", "Itajaí", -26.9078, -48.6619),
    Location::new("Prefeitura de Navegantes", "Navegantes", -26.8968, -48.6565),
    Location::new("Prefeitura de Penha", "Penha", -26.7711, -48.6506),
    Location::new("Prefeitura de Balneário Piçarras", "Balneário Piçarras", -26.7574, -48.6717),
    Location::new("Prefeitura de Balneário Camboriú", "Balneário Camboriú", -26.9906, -48.6349),
    Location::new("Prefeitura de Camboriú", "Camboriú", -27.0248, -48.6583),
    Location::new("Prefeitura de Itapema", "Itapema", -27.0890, -48.6114),
    Location::new("Prefeitura de Porto Belo", "Porto Belo", -27.1588, -48.5552),
    Location::new("Prefeitura de Bombinhas", "Bombinhas", -27.1433, -48.4884),
    Location::new("Prefeitura de Ilhota", "Ilhota", -26.8984, -48.8269),
    Location::new("Prefeitura de Luiz Alves", "Luiz Alves", -26.7169, -48.9357),
];

// ============================================================================
// Sanitation providers in downtown Itajaí (all within ~1 km)
// ============================================================================

pub const ITAJAI_DOWNTOWN: &[Location] = &[
    Location::new("SEMASA Itajaí", "Itajaí", -26.9101, -48.6631),
    Location::new("Coleta Seletiva Centro", "Itajaí", -26.9065, -48.6598),
    Location::new("Estação de Tratamento Centro", "Itajaí", -26.9088, -48.6650),
    Location::new("Ecoponto Fazenda", "Itajaí", -26.9120, -48.6605),
];

/// The three-stop scenario: Itajaí, Navegantes and Penha town halls.
pub fn itajai_navegantes_penha() -> Vec<VisitPoint> {
    TOWN_HALLS[..3]
        .iter()
        .enumerate()
        .map(|(i, location)| location.visit(&format!("th-{i}")))
        .collect()
}

/// Every town hall, cycling priorities P1, P2, P3.
pub fn all_town_halls() -> Vec<VisitPoint> {
    let priorities = [Priority::P1, Priority::P2, Priority::P3];
    TOWN_HALLS
        .iter()
        .enumerate()
        .map(|(i, location)| {
            location
                .visit(&format!("th-{i}"))
                .with_priority(priorities[i % 3])
        })
        .collect()
}

/// `n` visits cycling through the town halls, ids `v-0..v-n`.
pub fn cycling_visits(n: usize) -> Vec<VisitPoint> {
    (0..n)
        .map(|i| TOWN_HALLS[i % TOWN_HALLS.len()].visit(&format!("v-{i}")))
        .collect()
}

pub fn downtown_visits() -> Vec<VisitPoint> {
    ITAJAI_DOWNTOWN
        .iter()
        .enumerate()
        .map(|(i, location)| {
            location
                .visit(&format!("dt-{i}"))
                .with_entity_type("empresa_terceirizada")
        })
        .collect()
}
