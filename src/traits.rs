//! Seams towards the engine's collaborators.
//!
//! The engine consumes already-geocoded points and never performs I/O
//! itself. Callers plug their own data and geometry in through these traits.

use crate::model::{Coordinates, SurveyType, VisitPoint};

/// Provides a distance matrix in kilometers for a set of locations.
///
/// The matrix is indexed by the provided location order.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<f64>>;
}

/// Selection criteria passed to a [`PointSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointFilter {
    pub municipality: Option<String>,
    pub survey_type: Option<SurveyType>,
}

impl PointFilter {
    pub fn municipality(name: impl Into<String>) -> Self {
        Self {
            municipality: Some(name.into()),
            survey_type: None,
        }
    }

    pub fn with_survey_type(mut self, survey_type: SurveyType) -> Self {
        self.survey_type = Some(survey_type);
        self
    }

    /// A point collecting both surveys matches any survey filter.
    pub fn matches(&self, point: &VisitPoint) -> bool {
        let municipality_ok = self
            .municipality
            .as_deref()
            .is_none_or(|name| point.municipality == name);
        let survey_ok = self.survey_type.is_none_or(|wanted| {
            point.survey_type == wanted || point.survey_type == SurveyType::Both
        });
        municipality_ok && survey_ok
    }
}

/// Supplies visit points, typically backed by the scheduling database.
pub trait PointSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn points(&self, filter: &PointFilter) -> Result<Vec<VisitPoint>, Self::Error>;
}

/// A [`PointSource`] over an owned list of points.
#[derive(Debug, Clone, Default)]
pub struct MemoryPointSource {
    points: Vec<VisitPoint>,
}

impl MemoryPointSource {
    pub fn new(points: Vec<VisitPoint>) -> Self {
        Self { points }
    }
}

impl PointSource for MemoryPointSource {
    type Error = std::convert::Infallible;

    fn points(&self, filter: &PointFilter) -> Result<Vec<VisitPoint>, Self::Error> {
        Ok(self
            .points
            .iter()
            .filter(|point| filter.matches(point))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<VisitPoint> {
        vec![
            VisitPoint::new("1", "a", (-26.9, -48.6), "Penha").with_survey_type(SurveyType::Mrs),
            VisitPoint::new("2", "b", (-26.9, -48.6), "Penha").with_survey_type(SurveyType::Map),
            VisitPoint::new("3", "c", (-26.9, -48.6), "Itajaí"),
        ]
    }

    #[test]
    fn test_default_filter_matches_everything() {
        let source = MemoryPointSource::new(sample());
        assert_eq!(source.points(&PointFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn test_filter_by_municipality() {
        let source = MemoryPointSource::new(sample());
        let points = source.points(&PointFilter::municipality("Penha")).unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_both_survey_matches_any_survey_filter() {
        let source = MemoryPointSource::new(sample());
        let filter = PointFilter::default().with_survey_type(SurveyType::Map);
        let ids: Vec<_> = source
            .points(&filter)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }
}
