//! Fixed-threshold assessment and comparison of routes.

use std::fmt;

use jiff::SignedDuration;
use jiff::civil::Time;
use serde::Serialize;

use crate::haversine::{haversine_km, hours_to_duration};
use crate::model::{Coordinates, Priority};
use crate::objective::Objective;
use crate::route::Route;

pub const LOW_FUEL_KM: f64 = 30.0;
pub const HIGH_FUEL_KM: f64 = 60.0;
pub const HIGH_WORK_RATIO: f64 = 0.7;
pub const LOW_WORK_RATIO: f64 = 0.5;
pub const HIGH_THROUGHPUT_STOPS: usize = 6;
pub const LOW_THROUGHPUT_STOPS: usize = 3;
pub const WELL_OPTIMIZED_SCORE: f64 = 80.0;
pub const NEEDS_IMPROVEMENT_SCORE: f64 = 60.0;

/// Safety margin applied to planned duration when suggesting a start.
pub const TRAVEL_BUFFER_FACTOR: f64 = 1.2;
pub const LUNCH_BREAK: SignedDuration = SignedDuration::from_mins(60);
pub const EARLIEST_START: Time = Time::constant(8, 0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTag {
    LowFuelUse,
    HighFuelUse,
    HighProductiveTime,
    ExcessiveTravel,
    HighThroughput,
    LowThroughput,
    WellOptimized,
    NeedsImprovement,
}

impl RouteTag {
    pub const fn is_pro(self) -> bool {
        matches!(
            self,
            RouteTag::LowFuelUse
                | RouteTag::HighProductiveTime
                | RouteTag::HighThroughput
                | RouteTag::WellOptimized
        )
    }
}

impl fmt::Display for RouteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouteTag::LowFuelUse => "low fuel use",
            RouteTag::HighFuelUse => "high fuel use",
            RouteTag::HighProductiveTime => "high productive time (little driving)",
            RouteTag::ExcessiveTravel => "too much time driving",
            RouteTag::HighThroughput => "high productivity (many stops)",
            RouteTag::LowThroughput => "low productivity (few stops)",
            RouteTag::WellOptimized => "well optimized",
            RouteTag::NeedsImprovement => "route can be improved",
        })
    }
}

/// What kind of day a route suits best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BestUse {
    FuelSaver,
    MaximizeWorkTime,
    PriorityFocus,
    HalfDay,
    FullDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    GroupNearbyVisits,
    ReduceLegLength,
    VisitPriorityEarlier,
    SplitAcrossDays,
    GroupByRegion,
    ReviewSequence,
    /// Some stops fall outside opening hours or their time window.
    RescheduleOffHoursStops,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyMetrics {
    pub overall_score: f64,
    /// Route distance divided by the number of legs between stops.
    pub average_leg_km: f64,
    /// Share of the day spent on site.
    pub work_time_ratio: f64,
    pub geographic_spread_km: f64,
    pub points_per_hour: f64,
    /// 1 when every stop is equally far from the centroid.
    pub compactness: f64,
    pub municipalities: usize,
    pub p1_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteAnalysis {
    pub objective: Objective,
    pub metrics: EfficiencyMetrics,
    pub pros: Vec<RouteTag>,
    pub cons: Vec<RouteTag>,
    pub best_use: BestUse,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            Range {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |range, v| Range {
                min: range.min.min(v),
                max: range.max.max(v),
            },
        )
    }
}

/// Which candidate wins on each axis. Indices point into the compared slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativesComparison {
    pub best_by_distance: usize,
    pub best_by_time: usize,
    pub best_by_score: usize,
    pub distance_km: Range,
    pub hours: Range,
    pub score: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartTimeSuggestion {
    pub recommended_start: Time,
    pub target_end: Time,
    /// Planned duration with buffer and lunch break, in hours.
    pub required_hours: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EfficiencyAnalyzer;

impl EfficiencyAnalyzer {
    pub fn tags(&self, route: &Route) -> Vec<RouteTag> {
        let mut tags = Vec::new();
        let distance = route.total_distance_km();
        if distance < LOW_FUEL_KM {
            tags.push(RouteTag::LowFuelUse);
        } else if distance > HIGH_FUEL_KM {
            tags.push(RouteTag::HighFuelUse);
        }

        let ratio = work_time_ratio(route);
        if ratio > HIGH_WORK_RATIO {
            tags.push(RouteTag::HighProductiveTime);
        } else if ratio < LOW_WORK_RATIO {
            tags.push(RouteTag::ExcessiveTravel);
        }

        if route.len() >= HIGH_THROUGHPUT_STOPS {
            tags.push(RouteTag::HighThroughput);
        } else if route.len() <= LOW_THROUGHPUT_STOPS {
            tags.push(RouteTag::LowThroughput);
        }

        if route.efficiency() >= WELL_OPTIMIZED_SCORE {
            tags.push(RouteTag::WellOptimized);
        } else if route.efficiency() < NEEDS_IMPROVEMENT_SCORE {
            tags.push(RouteTag::NeedsImprovement);
        }
        tags
    }

    pub fn best_use(&self, route: &Route) -> BestUse {
        if route.total_distance_km() < 20.0 {
            BestUse::FuelSaver
        } else if route.travel_hours() < route.total_hours() * 0.3 {
            BestUse::MaximizeWorkTime
        } else if route.count_priority(Priority::P1) as f64 > route.len() as f64 * 0.5 {
            BestUse::PriorityFocus
        } else if route.total_hours() < 6.0 {
            BestUse::HalfDay
        } else {
            BestUse::FullDay
        }
    }

    pub fn metrics(&self, route: &Route) -> EfficiencyMetrics {
        let locations: Vec<Coordinates> = route.points().map(|p| p.location).collect();
        let legs = route.len().saturating_sub(1).max(1) as f64;
        let points_per_hour = if route.total_hours() > 0.0 {
            route.len() as f64 / route.total_hours()
        } else {
            0.0
        };

        EfficiencyMetrics {
            overall_score: route.efficiency(),
            average_leg_km: route.total_distance_km() / legs,
            work_time_ratio: work_time_ratio(route),
            geographic_spread_km: geographic_spread_km(&locations),
            points_per_hour,
            compactness: compactness(&locations),
            municipalities: route.municipalities().len(),
            p1_points: route.count_priority(Priority::P1),
        }
    }

    pub fn suggestions(&self, route: &Route, metrics: &EfficiencyMetrics) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        if route.is_empty() {
            return suggestions;
        }
        if metrics.work_time_ratio < 0.6 {
            suggestions.push(Suggestion::GroupNearbyVisits);
        }
        if metrics.average_leg_km > 5.0 {
            suggestions.push(Suggestion::ReduceLegLength);
        }
        let last_p1 = route
            .points()
            .enumerate()
            .filter(|(_, p)| p.priority == Priority::P1)
            .map(|(i, _)| i)
            .last();
        if last_p1.is_some_and(|i| i > route.len() / 2) {
            suggestions.push(Suggestion::VisitPriorityEarlier);
        }
        if route.total_hours() > 8.0 {
            suggestions.push(Suggestion::SplitAcrossDays);
        }
        if metrics.municipalities > 4 {
            suggestions.push(Suggestion::GroupByRegion);
        }
        if route.efficiency() < 70.0 {
            suggestions.push(Suggestion::ReviewSequence);
        }
        if route.off_schedule_stops().next().is_some() {
            suggestions.push(Suggestion::RescheduleOffHoursStops);
        }
        suggestions
    }

    pub fn analyze(&self, route: &Route) -> RouteAnalysis {
        let metrics = self.metrics(route);
        let (pros, cons): (Vec<_>, Vec<_>) =
            self.tags(route).into_iter().partition(|tag| tag.is_pro());
        RouteAnalysis {
            objective: route.objective(),
            suggestions: self.suggestions(route, &metrics),
            best_use: self.best_use(route),
            metrics,
            pros,
            cons,
        }
    }

    /// Best candidate per axis; the earliest candidate wins ties.
    pub fn compare(&self, routes: &[Route]) -> Option<AlternativesComparison> {
        let first = routes.first()?;
        let (mut by_distance, mut by_time, mut by_score) = (0, 0, 0);
        let (mut min_km, mut min_hours, mut max_score) =
            (first.total_distance_km(), first.total_hours(), first.efficiency());

        for (i, route) in routes.iter().enumerate().skip(1) {
            if route.total_distance_km() < min_km {
                min_km = route.total_distance_km();
                by_distance = i;
            }
            if route.total_hours() < min_hours {
                min_hours = route.total_hours();
                by_time = i;
            }
            if route.efficiency() > max_score {
                max_score = route.efficiency();
                by_score = i;
            }
        }

        Some(AlternativesComparison {
            best_by_distance: by_distance,
            best_by_time: by_time,
            best_by_score: by_score,
            distance_km: Range::of(routes.iter().map(Route::total_distance_km)),
            hours: Range::of(routes.iter().map(Route::total_hours)),
            score: Range::of(routes.iter().map(Route::efficiency)),
        })
    }

    /// Latest start that still ends by `target_end`, never before 08:00.
    pub fn suggest_start_time(&self, route: &Route, target_end: Time) -> StartTimeSuggestion {
        let buffered = hours_to_duration(route.total_hours() * TRAVEL_BUFFER_FACTOR);
        let required = buffered.saturating_add(LUNCH_BREAK);
        let recommended_start = target_end
            .checked_sub(required)
            .map_or(EARLIEST_START, |start| start.max(EARLIEST_START));

        StartTimeSuggestion {
            recommended_start,
            target_end,
            required_hours: required.as_secs_f64() / 3600.0,
        }
    }
}

fn work_time_ratio(route: &Route) -> f64 {
    if route.total_hours() > 0.0 {
        route.visit_hours() / route.total_hours()
    } else {
        0.0
    }
}

/// Diagonal of the points' bounding box.
fn geographic_spread_km(locations: &[Coordinates]) -> f64 {
    if locations.len() < 2 {
        return 0.0;
    }
    let (mut south, mut west) = (f64::INFINITY, f64::INFINITY);
    let (mut north, mut east) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in locations {
        south = south.min(c.lat);
        north = north.max(c.lat);
        west = west.min(c.lng);
        east = east.max(c.lng);
    }
    haversine_km(Coordinates::new(south, west), Coordinates::new(north, east))
}

fn compactness(locations: &[Coordinates]) -> f64 {
    if locations.len() < 3 {
        return 1.0;
    }
    let n = locations.len() as f64;
    let centre = Coordinates::new(
        locations.iter().map(|c| c.lat).sum::<f64>() / n,
        locations.iter().map(|c| c.lng).sum::<f64>() / n,
    );
    let distances: Vec<f64> = locations.iter().map(|c| haversine_km(centre, *c)).collect();
    let max = distances.iter().copied().fold(0.0, f64::max);
    if max == 0.0 {
        return 1.0;
    }
    let avg = distances.iter().sum::<f64>() / n;
    (1.0 - (max - avg) / max).clamp(0.0, 1.0)
}
