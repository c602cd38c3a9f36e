//! Visit points and the value types they carry.

use std::collections::BTreeMap;
use std::fmt;

use jiff::civil::Time;
use serde::{Deserialize, Serialize};

use crate::config::Geography;
use crate::error::{EngineError, Result};

/// Default on-site duration for a survey visit, in minutes.
pub const DEFAULT_VISIT_MINUTES: u32 = 120;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Survey-entity urgency tier. P1 is contacted first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    P1,
    #[default]
    P2,
    P3,
}

impl Priority {
    pub const fn rank(self) -> u8 {
        match self {
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Priority::P1),
            2 => Ok(Priority::P2),
            3 => Ok(Priority::P3),
            other => Err(EngineError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.rank()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.rank())
    }
}

/// Which questionnaire(s) a visit collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyType {
    /// Solid-waste management survey.
    Mrs,
    /// Rainwater-drainage survey.
    Map,
    #[default]
    Both,
}

/// Inclusive clock window during which a visit should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Time,
    pub end: Time,
}

impl TimeWindow {
    pub fn contains(&self, time: Time) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Opening hours of the visited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub open: Time,
    pub close: Time,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: Time::constant(8, 0, 0, 0),
            close: Time::constant(17, 0, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A location to visit during field research.
///
/// Built with [`VisitPoint::new`] and refined with the `with_*` methods.
/// Call [`VisitPoint::validate`] (the engine does) before planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitPoint {
    pub id: String,
    pub name: String,
    pub location: Coordinates,
    pub municipality: String,
    /// Kind of entity visited, e.g. "prefeitura", "empresa", "autarquia".
    pub entity_type: String,
    pub survey_type: SurveyType,
    pub priority: Priority,
    /// Estimated on-site duration in minutes.
    pub duration_minutes: u32,
    pub time_window: Option<TimeWindow>,
    pub business_hours: BusinessHours,
    pub contact: ContactInfo,
    pub requirements: Vec<String>,
}

impl VisitPoint {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<Coordinates>,
        municipality: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            municipality: municipality.into(),
            entity_type: "prefeitura".to_string(),
            survey_type: SurveyType::default(),
            priority: Priority::default(),
            duration_minutes: DEFAULT_VISIT_MINUTES,
            time_window: None,
            business_hours: BusinessHours::default(),
            contact: ContactInfo::default(),
            requirements: Vec::new(),
        }
    }

    /// Places a visit at the configured centre of its municipality.
    ///
    /// Returns `None` when the geography does not know the municipality.
    pub fn at_municipality(
        id: impl Into<String>,
        name: impl Into<String>,
        municipality: &str,
        geography: &Geography,
    ) -> Option<Self> {
        let centre = geography.centre_of(municipality)?;
        Some(Self::new(id, name, centre, municipality))
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = entity_type.into();
        self
    }

    pub fn with_survey_type(mut self, survey_type: SurveyType) -> Self {
        self.survey_type = survey_type;
        self
    }

    pub fn with_time_window(mut self, start: Time, end: Time) -> Self {
        self.time_window = Some(TimeWindow { start, end });
        self
    }

    pub fn with_business_hours(mut self, open: Time, close: Time) -> Self {
        self.business_hours = BusinessHours { open, close };
        self
    }

    pub fn with_contact(mut self, contact: ContactInfo) -> Self {
        self.contact = contact;
        self
    }

    pub fn requires(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Estimated on-site duration in hours.
    pub fn visit_hours(&self) -> f64 {
        f64::from(self.duration_minutes) / 60.0
    }

    pub fn validate(&self) -> Result<()> {
        if !self.location.is_valid() {
            return Err(EngineError::InvalidCoordinates {
                id: self.id.clone(),
                lat: self.location.lat,
                lng: self.location.lng,
            });
        }
        if self.duration_minutes == 0 {
            return Err(EngineError::NonPositiveDuration { id: self.id.clone() });
        }
        Ok(())
    }
}

/// Validates every point, failing on the first invalid one.
pub fn validate_all(points: &[VisitPoint]) -> Result<()> {
    points.iter().try_for_each(VisitPoint::validate)
}

/// Counts points per municipality, ordered by name.
pub fn count_by_municipality(points: &[VisitPoint]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for point in points {
        *counts.entry(point.municipality.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_integer() {
        assert_eq!(Priority::try_from(1).unwrap(), Priority::P1);
        assert_eq!(Priority::try_from(3).unwrap(), Priority::P3);
        assert!(matches!(
            Priority::try_from(4),
            Err(EngineError::InvalidPriority(4))
        ));
        assert!(Priority::try_from(0).is_err());
    }

    #[test]
    fn test_priority_orders_by_urgency() {
        assert!(Priority::P1 < Priority::P2);
        assert!(Priority::P2 < Priority::P3);
        assert_eq!(Priority::P1.to_string(), "P1");
    }

    #[test]
    fn test_priority_serializes_as_integer() {
        let json = serde_json::to_string(&Priority::P3).unwrap();
        assert_eq!(json, "3");
        let parsed: Priority = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Priority::P1);
        assert!(serde_json::from_str::<Priority>("7").is_err());
    }

    #[test]
    fn test_new_point_defaults() {
        let point = VisitPoint::new("1", "Prefeitura", (-26.9, -48.6), "Itajaí");
        assert_eq!(point.priority, Priority::P2);
        assert_eq!(point.duration_minutes, DEFAULT_VISIT_MINUTES);
        assert_eq!(point.survey_type, SurveyType::Both);
        assert_eq!(point.business_hours.open, Time::constant(8, 0, 0, 0));
        assert!(point.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_coordinates() {
        let point = VisitPoint::new("x", "Bad", (f64::NAN, -48.6), "Itajaí");
        assert!(matches!(
            point.validate(),
            Err(EngineError::InvalidCoordinates { .. })
        ));

        let point = VisitPoint::new("y", "Bad", (95.0, -48.6), "Itajaí");
        assert!(point.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let point = VisitPoint::new("z", "Quick", (-26.9, -48.6), "Itajaí").with_duration(0);
        assert!(matches!(
            point.validate(),
            Err(EngineError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn test_time_window_contains() {
        let window = TimeWindow {
            start: Time::constant(9, 0, 0, 0),
            end: Time::constant(11, 0, 0, 0),
        };
        assert!(window.contains(Time::constant(10, 30, 0, 0)));
        assert!(!window.contains(Time::constant(11, 1, 0, 0)));
    }

    #[test]
    fn test_count_by_municipality() {
        let points = vec![
            VisitPoint::new("1", "a", (-26.9, -48.6), "Penha"),
            VisitPoint::new("2", "b", (-26.9, -48.6), "Itajaí"),
            VisitPoint::new("3", "c", (-26.9, -48.6), "Penha"),
        ];
        let counts = count_by_municipality(&points);
        assert_eq!(counts["Penha"], 2);
        assert_eq!(counts["Itajaí"], 1);
    }
}
