//! Daily routes: totals, clock schedule and efficiency score.

use std::collections::BTreeSet;

use jiff::civil::Time;
use serde::Serialize;
use tracing::warn;

use crate::haversine::{TravelTimeEstimator, hours_to_duration};
use crate::model::{Coordinates, Priority, VisitPoint};
use crate::objective::Objective;
use crate::traits::DistanceMatrixProvider;

/// Efficiency of a route whose round trip has no length.
pub const DEGENERATE_EFFICIENCY: f64 = 100.0;

/// A visit with its planned clock times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledStop {
    pub point: VisitPoint,
    /// Length of the leg driven to reach this stop.
    pub leg_km: f64,
    pub arrival: Time,
    pub departure: Time,
    /// The whole visit falls within the entity's opening hours.
    pub within_business_hours: bool,
    /// Arrival falls in the point's time window. True when it has none.
    pub within_time_window: bool,
}

impl ScheduledStop {
    fn new(point: VisitPoint, leg_km: f64, arrival: Time, departure: Time) -> Self {
        let hours = point.business_hours;
        Self {
            within_business_hours: hours.open <= arrival && departure <= hours.close,
            within_time_window: point.time_window.is_none_or(|window| window.contains(arrival)),
            point,
            leg_km,
            arrival,
            departure,
        }
    }

    pub fn is_on_time(&self) -> bool {
        self.within_business_hours && self.within_time_window
    }
}

/// An ordered day of visits leaving from and returning to the base.
///
/// Only [`RouteBuilder`] creates non-empty routes and every derived field
/// is computed there from the final sequence, so a `Route` never carries
/// totals from another ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    base: Coordinates,
    stops: Vec<ScheduledStop>,
    total_distance_km: f64,
    return_leg_km: f64,
    travel_hours: f64,
    visit_hours: f64,
    total_hours: f64,
    start_time: Time,
    end_time: Time,
    efficiency: f64,
    objective: Objective,
}

impl Route {
    /// The "nothing to plan" sentinel.
    pub fn empty(base: Coordinates, start_time: Time, objective: Objective) -> Self {
        Self {
            base,
            stops: Vec::new(),
            total_distance_km: 0.0,
            return_leg_km: 0.0,
            travel_hours: 0.0,
            visit_hours: 0.0,
            total_hours: 0.0,
            start_time,
            end_time: start_time,
            efficiency: 0.0,
            objective,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn base(&self) -> Coordinates {
        self.base
    }

    pub fn stops(&self) -> &[ScheduledStop] {
        &self.stops
    }

    pub fn points(&self) -> impl Iterator<Item = &VisitPoint> {
        self.stops.iter().map(|stop| &stop.point)
    }

    /// Round-trip distance in kilometers, base to base.
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    /// Length of the drive from the last stop back to the base.
    pub fn return_leg_km(&self) -> f64 {
        self.return_leg_km
    }

    pub fn travel_hours(&self) -> f64 {
        self.travel_hours
    }

    pub fn visit_hours(&self) -> f64 {
        self.visit_hours
    }

    /// Always `travel_hours + visit_hours`.
    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// Return time at the base. Clamped to the end of the day.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// Score in `[0, 100]`; see [`efficiency_score`].
    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Distinct municipalities on the route, sorted.
    pub fn municipalities(&self) -> Vec<&str> {
        self.points()
            .map(|point| point.municipality.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn count_priority(&self, priority: Priority) -> usize {
        self.points().filter(|point| point.priority == priority).count()
    }

    /// Stops scheduled outside opening hours or their time window.
    pub fn off_schedule_stops(&self) -> impl Iterator<Item = &ScheduledStop> {
        self.stops.iter().filter(|stop| !stop.is_on_time())
    }
}

/// `100 × Σ independent round trips / sequenced round trip`, clamped.
///
/// A zero-length sequenced round trip (everything at the base) scores
/// [`DEGENERATE_EFFICIENCY`].
pub fn efficiency_score(independent_round_trips_km: f64, sequenced_km: f64) -> f64 {
    if sequenced_km <= 0.0 {
        return DEGENERATE_EFFICIENCY;
    }
    (100.0 * independent_round_trips_km / sequenced_km).clamp(0.0, 100.0)
}

/// Turns an ordered list of points into a [`Route`].
#[derive(Debug, Clone)]
pub struct RouteBuilder<'a, M> {
    base: Coordinates,
    start_time: Time,
    estimator: TravelTimeEstimator,
    matrix_provider: &'a M,
}

impl<'a, M: DistanceMatrixProvider> RouteBuilder<'a, M> {
    pub fn new(
        base: Coordinates,
        start_time: Time,
        estimator: TravelTimeEstimator,
        matrix_provider: &'a M,
    ) -> Self {
        Self {
            base,
            start_time,
            estimator,
            matrix_provider,
        }
    }

    /// Builds the route visiting `ordered` in the given order.
    pub fn build(&self, ordered: Vec<VisitPoint>, objective: Objective) -> Route {
        if ordered.is_empty() {
            return Route::empty(self.base, self.start_time, objective);
        }

        let mut locations = Vec::with_capacity(ordered.len() + 1);
        locations.push(self.base);
        locations.extend(ordered.iter().map(|point| point.location));
        let matrix = self.matrix_provider.matrix_for(&locations);
        let order: Vec<usize> = (0..ordered.len()).collect();
        self.build_sequenced(ordered, &order, &matrix, objective)
    }

    /// Builds the route visiting `points[order[0]]`, `points[order[1]]`, ...
    ///
    /// `matrix` is indexed `[base, points..]` in input order, the layout
    /// the sequencer works on. `order` must be a permutation of the point
    /// indices.
    pub fn build_sequenced(
        &self,
        points: Vec<VisitPoint>,
        order: &[usize],
        matrix: &[Vec<f64>],
        objective: Objective,
    ) -> Route {
        if points.is_empty() {
            return Route::empty(self.base, self.start_time, objective);
        }

        let mut slots: Vec<Option<VisitPoint>> = points.into_iter().map(Some).collect();
        let ordered = order
            .iter()
            .filter_map(|&i| slots.get_mut(i).and_then(Option::take).map(|point| (i + 1, point)));

        let mut clock = self.start_time;
        let mut previous = 0;
        let mut total_distance_km = 0.0;
        let mut independent_km = 0.0;
        let mut visit_hours = 0.0;
        let mut stops = Vec::with_capacity(order.len());

        for (location, point) in ordered {
            let leg_km = matrix[previous][location];
            total_distance_km += leg_km;
            independent_km += 2.0 * matrix[0][location];
            visit_hours += point.visit_hours();

            let arrival = clock.saturating_add(self.estimator.duration_for_km(leg_km));
            let departure = arrival.saturating_add(hours_to_duration(point.visit_hours()));
            clock = departure;
            previous = location;

            stops.push(ScheduledStop::new(point, leg_km, arrival, departure));
        }

        let return_leg_km = matrix[previous][0];
        total_distance_km += return_leg_km;
        let end_time = clock.saturating_add(self.estimator.duration_for_km(return_leg_km));

        let travel_hours = self.estimator.hours_for_km(total_distance_km);
        let total_hours = travel_hours + visit_hours;
        if self
            .start_time
            .checked_add(hours_to_duration(total_hours))
            .is_err()
        {
            warn!(total_hours, "route runs past midnight; end time clamped");
        }

        Route {
            base: self.base,
            stops,
            total_distance_km,
            return_leg_km,
            travel_hours,
            visit_hours,
            total_hours,
            start_time: self.start_time,
            end_time,
            efficiency: efficiency_score(independent_km, total_distance_km),
            objective,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::{HaversineMatrix, haversine_km};

    const BASE: Coordinates = Coordinates::new(-26.9076, -48.6619);

    fn builder() -> RouteBuilder<'static, HaversineMatrix> {
        RouteBuilder::new(
            BASE,
            Time::constant(8, 0, 0, 0),
            TravelTimeEstimator::default(),
            &HaversineMatrix,
        )
    }

    #[test]
    fn test_empty_route_sentinel() {
        let route = builder().build(Vec::new(), Objective::Distance);
        assert!(route.is_empty());
        assert_eq!(route.total_distance_km(), 0.0);
        assert_eq!(route.total_hours(), 0.0);
        assert_eq!(route.start_time(), route.end_time());
        assert_eq!(route.efficiency(), 0.0);
    }

    #[test]
    fn test_single_point_at_base() {
        let point = VisitPoint::new("1", "Base", BASE, "Itajaí").with_duration(60);
        let route = builder().build(vec![point], Objective::Distance);
        assert_eq!(route.len(), 1);
        assert!(route.total_distance_km() < 1e-9);
        assert!(route.travel_hours() < 1e-9);
        assert_eq!(route.efficiency(), 100.0);
        assert_eq!(route.stops()[0].arrival, Time::constant(8, 0, 0, 0));
        assert_eq!(route.stops()[0].departure, Time::constant(9, 0, 0, 0));
        assert_eq!(route.end_time(), Time::constant(9, 0, 0, 0));
    }

    #[test]
    fn test_single_point_round_trip() {
        let penha = Coordinates::new(-26.7711, -48.6506);
        let route = builder().build(
            vec![VisitPoint::new("1", "Penha", penha, "Penha")],
            Objective::Distance,
        );
        let expected = 2.0 * haversine_km(BASE, penha);
        assert!((route.total_distance_km() - expected).abs() < 1e-9);
        assert!((route.return_leg_km() - haversine_km(penha, BASE)).abs() < 1e-9);
        assert_eq!(route.efficiency(), 100.0);
    }

    #[test]
    fn test_totals_add_up() {
        let points = vec![
            VisitPoint::new("1", "a", (-26.8968, -48.6565), "Navegantes"),
            VisitPoint::new("2", "b", (-26.7711, -48.6506), "Penha").with_duration(90),
        ];
        let route = builder().build(points, Objective::Distance);
        assert_eq!(route.total_hours(), route.travel_hours() + route.visit_hours());
        assert_eq!(route.visit_hours(), 3.5);
        assert!((route.travel_hours() - route.total_distance_km() / 45.0).abs() < 1e-12);
        let legs: f64 = route.stops().iter().map(|s| s.leg_km).sum::<f64>() + route.return_leg_km();
        assert!((legs - route.total_distance_km()).abs() < 1e-9);
    }

    #[test]
    fn test_clock_schedule_chains_legs() {
        // 0.45 degrees of longitude at the equator is ~50 km, ~67 minutes at 45 km/h
        let base = Coordinates::new(0.0, 0.0);
        let builder = RouteBuilder::new(
            base,
            Time::constant(8, 0, 0, 0),
            TravelTimeEstimator::default(),
            &HaversineMatrix,
        );
        let points = vec![
            VisitPoint::new("1", "a", (0.0, 0.45), "X").with_duration(30),
            VisitPoint::new("2", "b", (0.0, 0.9), "X").with_duration(30),
        ];
        let route = builder.build(points, Objective::Distance);
        let stops = route.stops();
        assert!(stops[0].arrival > Time::constant(8, 0, 0, 0));
        assert_eq!(
            stops[0].departure,
            stops[0].arrival.saturating_add(jiff::SignedDuration::from_mins(30))
        );
        assert!(stops[1].arrival > stops[0].departure);
        assert!(route.end_time() > stops[1].departure);
    }

    #[test]
    fn test_long_day_clamps_end_time() {
        let far = VisitPoint::new("1", "far", (-26.9, -48.6), "X").with_duration(23 * 60);
        let route = RouteBuilder::new(
            BASE,
            Time::constant(20, 0, 0, 0),
            TravelTimeEstimator::default(),
            &HaversineMatrix,
        )
        .build(vec![far], Objective::Distance);
        assert_eq!(route.end_time(), Time::MAX);
    }

    #[test]
    fn test_efficiency_score_bounds() {
        assert_eq!(efficiency_score(0.0, 0.0), 100.0);
        assert_eq!(efficiency_score(50.0, 25.0), 100.0);
        assert_eq!(efficiency_score(20.0, 40.0), 50.0);
        assert_eq!(efficiency_score(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_route_municipalities_and_priorities() {
        let points = vec![
            VisitPoint::new("1", "a", (-26.77, -48.65), "Penha").with_priority(Priority::P1),
            VisitPoint::new("2", "b", (-26.89, -48.65), "Navegantes"),
            VisitPoint::new("3", "c", (-26.78, -48.65), "Penha").with_priority(Priority::P1),
        ];
        let route = builder().build(points, Objective::Distance);
        assert_eq!(route.municipalities(), vec!["Navegantes", "Penha"]);
        assert_eq!(route.count_priority(Priority::P1), 2);
    }

    #[test]
    fn test_sequenced_build_matches_reordered_build() {
        let points = vec![
            VisitPoint::new("penha", "a", (-26.7711, -48.6506), "Penha"),
            VisitPoint::new("navegantes", "b", (-26.8968, -48.6565), "Navegantes"),
            VisitPoint::new("itajai", "c", (-26.9078, -48.6619), "Itajaí").with_duration(45),
        ];
        let mut locations = vec![BASE];
        locations.extend(points.iter().map(|p| p.location));
        let matrix = HaversineMatrix.matrix_for(&locations);

        let order = [2, 1, 0];
        let sequenced =
            builder().build_sequenced(points.clone(), &order, &matrix, Objective::Distance);
        let reordered: Vec<_> = order.iter().map(|&i| points[i].clone()).collect();
        let rebuilt = builder().build(reordered, Objective::Distance);

        assert_eq!(sequenced, rebuilt);
        let ids: Vec<_> = sequenced.points().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["itajai", "navegantes", "penha"]);
    }

    #[test]
    fn test_stops_within_business_hours() {
        let points = vec![
            VisitPoint::new("1", "a", (-26.8968, -48.6565), "Navegantes").with_duration(60),
            // Still on site at 17:00
            VisitPoint::new("2", "b", (-26.8970, -48.6560), "Navegantes").with_duration(8 * 60),
        ];
        let route = builder().build(points, Objective::Distance);
        let stops = route.stops();
        assert!(stops[0].within_business_hours);
        assert!(stops[0].is_on_time());
        assert!(!stops[1].within_business_hours);
        assert!(stops[1].within_time_window);

        let off: Vec<_> = route.off_schedule_stops().map(|s| s.point.id.as_str()).collect();
        assert_eq!(off, vec!["2"]);
    }

    #[test]
    fn test_early_start_is_outside_business_hours() {
        let point = VisitPoint::new("1", "Base", BASE, "Itajaí")
            .with_duration(30)
            .with_business_hours(Time::constant(9, 0, 0, 0), Time::constant(12, 0, 0, 0));
        let route = builder().build(vec![point], Objective::Distance);
        assert!(!route.stops()[0].within_business_hours);
    }

    #[test]
    fn test_stops_within_time_window() {
        let nine = Time::constant(9, 0, 0, 0);
        let ten = Time::constant(10, 0, 0, 0);
        let points: Vec<_> = ["1", "2", "3"]
            .into_iter()
            .map(|id| {
                VisitPoint::new(id, id, BASE, "Itajaí")
                    .with_duration(60)
                    .with_time_window(nine, ten)
            })
            .collect();
        // Arrivals at 08:00, 09:00 and 10:00; the window is inclusive
        let route = builder().build(points, Objective::Distance);
        let flags: Vec<_> = route.stops().iter().map(|s| s.within_time_window).collect();
        assert_eq!(flags, vec![false, true, true]);
        assert_eq!(route.stops()[2].arrival, ten);
        assert_eq!(route.off_schedule_stops().count(), 1);
    }
}
