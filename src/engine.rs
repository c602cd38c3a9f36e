//! Library boundary: every planning operation goes through [`RouteEngine`].

use jiff::civil::{Date, Time};
use tracing::info;

use crate::alternatives;
use crate::analysis::{AlternativesComparison, EfficiencyAnalyzer, RouteAnalysis};
use crate::cluster::{self, Cluster};
use crate::config::EngineConfig;
use crate::coverage::{self, CoverageConfig, CoverageGrid};
use crate::error::{EngineError, Result};
use crate::haversine::{HaversineMatrix, TravelTimeEstimator};
use crate::model::{Coordinates, VisitPoint, count_by_municipality, validate_all};
use crate::objective::Objective;
use crate::route::{Route, RouteBuilder};
use crate::sequencer::sequence;
use crate::traits::{DistanceMatrixProvider, PointFilter, PointSource};
use crate::weekly::{WeeklyOptions, WeeklyPlan, schedule_week};

/// Plans routes and analyzes coverage under a fixed configuration.
///
/// Holds no mutable state: calls can run concurrently from many threads.
#[derive(Debug, Clone)]
pub struct RouteEngine<M = HaversineMatrix> {
    config: EngineConfig,
    matrix_provider: M,
}

impl Default for RouteEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            matrix_provider: HaversineMatrix,
        }
    }
}

impl RouteEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_matrix_provider(config, HaversineMatrix)
    }
}

impl<M: DistanceMatrixProvider + Sync> RouteEngine<M> {
    pub fn with_matrix_provider(config: EngineConfig, matrix_provider: M) -> Result<Self> {
        let speed = config.average_speed_kmh;
        if !(speed.is_finite() && speed > 0.0) {
            return Err(EngineError::InvalidSpeed(speed));
        }
        validate_base(config.base.location)?;
        if !(config.cluster_radius_km.is_finite() && config.cluster_radius_km > 0.0) {
            return Err(EngineError::InvalidRadius(config.cluster_radius_km));
        }
        config.coverage.validate()?;

        Ok(Self {
            config,
            matrix_provider,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matrix_provider(&self) -> &M {
        &self.matrix_provider
    }

    fn estimator(&self) -> TravelTimeEstimator {
        TravelTimeEstimator::new(self.config.average_speed_kmh)
    }

    /// Sequences and schedules one day of visits from `base`.
    pub fn optimize_daily_route(
        &self,
        points: &[VisitPoint],
        base: Coordinates,
        start_time: Time,
        objective: Objective,
    ) -> Result<Route> {
        validate_all(points)?;
        validate_base(base)?;
        let route = self.plan_day(points.to_vec(), base, start_time, objective);
        info!(
            points = route.len(),
            municipalities = count_by_municipality(points).len(),
            distance_km = route.total_distance_km(),
            hours = route.total_hours(),
            efficiency = route.efficiency(),
            objective = %objective,
            "optimized daily route"
        );
        Ok(route)
    }

    /// Like [`Self::optimize_daily_route`] with points pulled from `source`.
    pub fn optimize_daily_route_from<S: PointSource>(
        &self,
        source: &S,
        filter: &PointFilter,
        base: Coordinates,
        start_time: Time,
        objective: Objective,
    ) -> Result<Route> {
        let points = source
            .points(filter)
            .map_err(|err| EngineError::Source(Box::new(err)))?;
        self.optimize_daily_route(&points, base, start_time, objective)
    }

    /// Spreads `points` over consecutive days from the configured base.
    pub fn optimize_weekly_plan(
        &self,
        points: &[VisitPoint],
        start_date: Date,
        working_days: usize,
    ) -> Result<WeeklyPlan> {
        self.optimize_weekly_plan_with(points, start_date, WeeklyOptions::new(working_days))
    }

    pub fn optimize_weekly_plan_with(
        &self,
        points: &[VisitPoint],
        start_date: Date,
        options: WeeklyOptions,
    ) -> Result<WeeklyPlan> {
        validate_all(points)?;
        let base = self.config.base.location;
        let start_time = self.config.day_start;
        let objective = self.config.weekly_objective;

        let plan = schedule_week(points.to_vec(), start_date, options, |chunk| {
            self.plan_day(chunk, base, start_time, objective)
        })?;
        info!(
            points = plan.total_points(),
            days = plan.len(),
            %start_date,
            "optimized weekly plan"
        );
        Ok(plan)
    }

    /// One route per objective, at most four, built from the configured base.
    pub fn generate_alternatives(&self, points: &[VisitPoint], count: usize) -> Result<Vec<Route>> {
        validate_all(points)?;
        let base = self.config.base.location;
        let start_time = self.config.day_start;

        let routes = alternatives::generate(count, |objective| {
            self.plan_day(points.to_vec(), base, start_time, objective)
        });
        info!(points = points.len(), candidates = routes.len(), "generated alternatives");
        Ok(routes)
    }

    pub fn analyze_route(&self, route: &Route) -> RouteAnalysis {
        EfficiencyAnalyzer.analyze(route)
    }

    pub fn compare_alternatives(&self, routes: &[Route]) -> Option<AlternativesComparison> {
        EfficiencyAnalyzer.compare(routes)
    }

    pub fn analyze_coverage(
        &self,
        points: &[VisitPoint],
        config: &CoverageConfig,
    ) -> Result<CoverageGrid> {
        validate_all(points)?;
        let clusters = cluster::detect(points, self.config.cluster_radius_km)?;
        let grid = coverage::analyze(points, config, &clusters)?;
        info!(
            points = points.len(),
            cells = grid.total_cells(),
            coverage_percent = grid.coverage_percent(),
            gaps = grid.gaps().len(),
            clusters = clusters.len(),
            recommendations = grid.recommendations().len(),
            "analyzed coverage"
        );
        Ok(grid)
    }

    pub fn detect_clusters(&self, points: &[VisitPoint], radius_km: f64) -> Result<Vec<Cluster>> {
        validate_all(points)?;
        let clusters = cluster::detect(points, radius_km)?;
        info!(points = points.len(), clusters = clusters.len(), radius_km, "detected clusters");
        Ok(clusters)
    }

    fn plan_day(
        &self,
        points: Vec<VisitPoint>,
        base: Coordinates,
        start_time: Time,
        objective: Objective,
    ) -> Route {
        let builder = RouteBuilder::new(base, start_time, self.estimator(), &self.matrix_provider);
        if points.is_empty() {
            return builder.build(points, objective);
        }

        let mut locations = Vec::with_capacity(points.len() + 1);
        locations.push(base);
        locations.extend(points.iter().map(|point| point.location));
        let matrix = self.matrix_provider.matrix_for(&locations);

        let order = sequence(&points, &matrix, objective, self.config.average_speed_kmh);
        builder.build_sequenced(points, &order, &matrix, objective)
    }
}

fn validate_base(base: Coordinates) -> Result<()> {
    if base.is_valid() {
        return Ok(());
    }
    Err(EngineError::InvalidCoordinates {
        id: "base".to_string(),
        lat: base.lat,
        lng: base.lng,
    })
}
