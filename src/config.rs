//! Engine configuration.
//!
//! Everything the engine needs besides the points themselves: the base the
//! field team leaves from, the speed model, day defaults and the geography
//! of the surveyed municipalities. Loadable from JSON; every field has a
//! default so partial documents work.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use jiff::civil::Time;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coverage::CoverageConfig;
use crate::haversine::DEFAULT_SPEED_KMH;
use crate::model::Coordinates;
use crate::objective::Objective;

/// Default radius used by cluster detection, in kilometers.
pub const DEFAULT_CLUSTER_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where every daily route starts and ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseLocation {
    pub name: String,
    pub location: Coordinates,
}

impl Default for BaseLocation {
    fn default() -> Self {
        Self {
            name: "Agência IBGE Itajaí".to_string(),
            location: Coordinates::new(-26.9076, -48.6619),
        }
    }
}

/// Municipality name to centre coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geography {
    municipalities: BTreeMap<String, Coordinates>,
}

impl Geography {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_municipality(mut self, name: impl Into<String>, centre: Coordinates) -> Self {
        self.municipalities.insert(name.into(), centre);
        self
    }

    /// The eleven municipalities of the 2024 sanitation survey.
    pub fn pnsb_2024() -> Self {
        [
            ("Balneário Camboriú", -26.9906, -48.6349),
            ("Balneário Piçarras", -26.7574, -48.6717),
            ("Bombinhas", -27.1433, -48.4884),
            ("Camboriú", -27.0248, -48.6583),
            ("Itajaí", -26.9076, -48.6619),
            ("Itapema", -27.0890, -48.6114),
            ("Luiz Alves", -26.7169, -48.9357),
            ("Navegantes", -26.8968, -48.6565),
            ("Penha", -26.7711, -48.6506),
            ("Porto Belo", -27.1588, -48.5552),
            ("Ilhota", -26.8984, -48.8269),
        ]
        .into_iter()
        .fold(Self::new(), |geo, (name, lat, lng)| {
            geo.with_municipality(name, Coordinates::new(lat, lng))
        })
    }

    pub fn centre_of(&self, municipality: &str) -> Option<Coordinates> {
        self.municipalities.get(municipality).copied()
    }

    pub fn municipalities(&self) -> impl Iterator<Item = (&str, Coordinates)> {
        self.municipalities
            .iter()
            .map(|(name, centre)| (name.as_str(), *centre))
    }

    pub fn len(&self) -> usize {
        self.municipalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base: BaseLocation,
    /// Assumed average driving speed in km/h.
    pub average_speed_kmh: f64,
    /// Clock time at which each planned day starts.
    pub day_start: Time,
    /// Objective used to sequence each day of a weekly plan.
    pub weekly_objective: Objective,
    pub cluster_radius_km: f64,
    pub coverage: CoverageConfig,
    pub geography: Geography,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base: BaseLocation::default(),
            average_speed_kmh: DEFAULT_SPEED_KMH,
            day_start: Time::constant(8, 0, 0, 0),
            weekly_objective: Objective::Distance,
            cluster_radius_km: DEFAULT_CLUSTER_RADIUS_KM,
            coverage: CoverageConfig::default(),
            geography: Geography::pnsb_2024(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base.location.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "base location ({}, {}) is out of range",
                self.base.location.lat, self.base.location.lng
            )));
        }
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "average speed must be positive, got {}",
                self.average_speed_kmh
            )));
        }
        if !(self.cluster_radius_km.is_finite() && self.cluster_radius_km > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cluster radius must be positive, got {}",
                self.cluster_radius_km
            )));
        }
        self.coverage
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some((name, _)) = self.geography.municipalities().find(|(_, c)| !c.is_valid()) {
            return Err(ConfigError::Invalid(format!(
                "municipality {name} has invalid coordinates"
            )));
        }
        Ok(())
    }
}
