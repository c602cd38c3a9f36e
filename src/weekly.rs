//! Weekly plans: points spread over working days, one route per day.

use jiff::civil::{Date, Weekday};
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::model::{Priority, VisitPoint};
use crate::route::Route;

/// Fuel use of the field vehicle, litres per 100 km.
pub const FUEL_LITRES_PER_100_KM: f64 = 12.0;
/// Fuel price per litre, in local currency.
pub const FUEL_PRICE_PER_LITRE: f64 = 5.50;
/// Light-vehicle emission factor, kg of CO2 per km.
pub const CO2_KG_PER_KM: f64 = 0.12;
/// A working day longer than this is flagged.
pub const LONG_DAY_HOURS: f64 = 8.0;

const IMBALANCE_THRESHOLD: usize = 3;
const HIGH_DAILY_DISTANCE_KM: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyOptions {
    pub working_days: usize,
    /// Move days that would land on Saturday or Sunday to the next Monday.
    pub skip_weekends: bool,
}

impl WeeklyOptions {
    pub fn new(working_days: usize) -> Self {
        Self {
            working_days,
            skip_weekends: false,
        }
    }

    pub fn skipping_weekends(mut self) -> Self {
        self.skip_weekends = true;
        self
    }
}

impl Default for WeeklyOptions {
    fn default() -> Self {
        Self::new(5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedDay {
    pub date: Date,
    pub route: Route,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyPlan {
    days: Vec<PlannedDay>,
}

impl WeeklyPlan {
    pub fn days(&self) -> &[PlannedDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.days.iter().map(|day| day.route.len()).sum()
    }

    pub fn summary(&self) -> WeeklySummary {
        WeeklySummary::from_plan(self)
    }
}

/// Orders points the way a week is filled: most urgent first, then
/// grouped by municipality. Stable, so input order breaks remaining ties.
pub fn sort_for_week(points: &mut [VisitPoint]) {
    points.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.municipality.cmp(&b.municipality))
    });
}

/// Splits points into `max(1, n / days)`-sized chunks, at most `days` of
/// them, the last chunk taking the remainder. Never yields an empty chunk.
pub fn partition(points: Vec<VisitPoint>, days: usize) -> Result<Vec<Vec<VisitPoint>>> {
    if days == 0 {
        return Err(EngineError::NoWorkingDays);
    }
    let n = points.len();
    let chunk = (n / days).max(1);
    let chunk_count = days.min(n);

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut rest = points.into_iter();
    for day in 0..chunk_count {
        let take = if day + 1 == chunk_count { n - day * chunk } else { chunk };
        chunks.push(rest.by_ref().take(take).collect());
    }
    Ok(chunks)
}

fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// Consecutive calendar dates from `start`, optionally skipping weekends.
pub fn plan_dates(start: Date, count: usize, skip_weekends: bool) -> Result<Vec<Date>> {
    let mut dates = Vec::with_capacity(count);
    let mut date = start;
    for day in 0..count {
        if day > 0 {
            date = date.tomorrow()?;
        }
        if skip_weekends {
            while is_weekend(date) {
                date = date.tomorrow()?;
            }
        }
        dates.push(date);
    }
    Ok(dates)
}

/// Sorts, partitions and dates the week; `build_day` sequences each chunk.
pub fn schedule_week<F>(
    mut points: Vec<VisitPoint>,
    start_date: Date,
    options: WeeklyOptions,
    mut build_day: F,
) -> Result<WeeklyPlan>
where
    F: FnMut(Vec<VisitPoint>) -> Route,
{
    if options.working_days == 0 {
        return Err(EngineError::NoWorkingDays);
    }
    if points.is_empty() {
        return Ok(WeeklyPlan::default());
    }

    sort_for_week(&mut points);
    let chunks = partition(points, options.working_days)?;
    let dates = plan_dates(start_date, chunks.len(), options.skip_weekends)?;

    let days = chunks
        .into_iter()
        .zip(dates)
        .map(|(chunk, date)| {
            debug!(%date, points = chunk.len(), "planning day");
            PlannedDay {
                date,
                route: build_day(chunk),
            }
        })
        .collect();

    Ok(WeeklyPlan { days })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelEstimate {
    pub distance_km: f64,
    pub litres: f64,
    pub cost: f64,
}

impl FuelEstimate {
    pub fn for_distance(distance_km: f64) -> Self {
        let litres = distance_km / 100.0 * FUEL_LITRES_PER_100_KM;
        Self {
            distance_km,
            litres,
            cost: litres * FUEL_PRICE_PER_LITRE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeeklyRecommendation {
    /// Busiest and lightest day differ by more than three points.
    RebalanceLoad { max_points: usize, min_points: usize },
    /// Average daily distance above 40 km.
    GroupByProximity,
    /// P1 entities should be visited in the first days.
    FrontLoadPriority { p1_points: usize },
    /// Days planned longer than eight hours.
    ShortenLongDays { long_days: usize },
}

/// Aggregate statistics over a weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub total_days: usize,
    pub total_points: usize,
    pub total_distance_km: f64,
    pub total_hours: f64,
    pub average_efficiency: f64,
    pub average_points_per_day: f64,
    pub average_distance_per_day_km: f64,
    pub fuel: FuelEstimate,
    pub co2_kg: f64,
    pub recommendations: Vec<WeeklyRecommendation>,
}

impl WeeklySummary {
    pub fn from_plan(plan: &WeeklyPlan) -> Self {
        let total_days = plan.len();
        let total_points = plan.total_points();
        let total_distance_km: f64 = plan.days.iter().map(|d| d.route.total_distance_km()).sum();
        let total_hours: f64 = plan.days.iter().map(|d| d.route.total_hours()).sum();
        let days = total_days.max(1) as f64;

        Self {
            total_days,
            total_points,
            total_distance_km,
            total_hours,
            average_efficiency: plan.days.iter().map(|d| d.route.efficiency()).sum::<f64>() / days,
            average_points_per_day: total_points as f64 / days,
            average_distance_per_day_km: total_distance_km / days,
            fuel: FuelEstimate::for_distance(total_distance_km),
            co2_kg: total_distance_km * CO2_KG_PER_KM,
            recommendations: recommend(plan),
        }
    }
}

fn recommend(plan: &WeeklyPlan) -> Vec<WeeklyRecommendation> {
    let mut recommendations = Vec::new();
    if plan.is_empty() {
        return recommendations;
    }

    let loads = plan.days.iter().map(|day| day.route.len());
    let max_points = loads.clone().max().unwrap_or(0);
    let min_points = loads.min().unwrap_or(0);
    if max_points - min_points > IMBALANCE_THRESHOLD {
        recommendations.push(WeeklyRecommendation::RebalanceLoad {
            max_points,
            min_points,
        });
    }

    let average_km = plan
        .days
        .iter()
        .map(|day| day.route.total_distance_km())
        .sum::<f64>()
        / plan.len() as f64;
    if average_km > HIGH_DAILY_DISTANCE_KM {
        recommendations.push(WeeklyRecommendation::GroupByProximity);
    }

    let p1_points: usize = plan
        .days
        .iter()
        .map(|day| day.route.count_priority(Priority::P1))
        .sum();
    if p1_points > 0 {
        recommendations.push(WeeklyRecommendation::FrontLoadPriority { p1_points });
    }

    let long_days = plan
        .days
        .iter()
        .filter(|day| day.route.total_hours() > LONG_DAY_HOURS)
        .count();
    if long_days > 0 {
        recommendations.push(WeeklyRecommendation::ShortenLongDays { long_days });
    }

    recommendations
}
