//! Greedy objectives steering the route sequencer.
//!
//! Every objective is applied one step at a time: from the current stop,
//! each unvisited candidate gets a [`StepCost`] and the cheapest wins.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::VisitPoint;

/// Weight of normalized distance in the balanced objective.
pub const BALANCED_DISTANCE_WEIGHT: f64 = 0.7;
/// Weight of inverse urgency in the balanced objective.
pub const BALANCED_PRIORITY_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Plain nearest neighbor on leg distance.
    #[default]
    Distance,
    /// Leg driving time plus the candidate's on-site time.
    Time,
    /// Most urgent first, distance breaking ties.
    Priority,
    /// Weighted mix of normalized distance and inverse urgency.
    Balanced,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::Distance,
        Objective::Priority,
        Objective::Balanced,
        Objective::Time,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Objective::Distance => "distance",
            Objective::Time => "time",
            Objective::Priority => "priority",
            Objective::Balanced => "balanced",
        }
    }

    /// Cost of moving to `candidate` over a leg of `leg_km`.
    ///
    /// `max_leg_km` is the longest leg from the current stop to any
    /// remaining candidate and only matters for [`Objective::Balanced`].
    pub(crate) fn step_cost(
        self,
        candidate: &VisitPoint,
        leg_km: f64,
        max_leg_km: f64,
        speed_kmh: f64,
    ) -> StepCost {
        match self {
            Objective::Distance => StepCost::scalar(leg_km),
            Objective::Time => StepCost::scalar(leg_km / speed_kmh + candidate.visit_hours()),
            Objective::Priority => StepCost {
                rank: candidate.priority.rank(),
                value: leg_km,
            },
            Objective::Balanced => {
                let normalized = if max_leg_km > 0.0 { leg_km / max_leg_km } else { 0.0 };
                let inverse_urgency = f64::from(candidate.priority.rank() - 1) / 2.0;
                StepCost::scalar(
                    BALANCED_DISTANCE_WEIGHT * normalized
                        + BALANCED_PRIORITY_WEIGHT * inverse_urgency,
                )
            }
        }
    }

    /// Whether [`Objective::step_cost`] needs the longest remaining leg.
    pub(crate) const fn needs_max_leg(self) -> bool {
        matches!(self, Objective::Balanced)
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lexicographic step cost: `rank` first, then `value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StepCost {
    rank: u8,
    value: f64,
}

impl StepCost {
    const fn scalar(value: f64) -> Self {
        Self { rank: 0, value }
    }

    /// Strictly cheaper; equal costs keep the earlier candidate.
    pub(crate) fn beats(&self, other: &StepCost) -> bool {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.value.total_cmp(&other.value))
            == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;

    fn point(priority: Priority, minutes: u32) -> VisitPoint {
        VisitPoint::new("p", "p", (0.0, 0.0), "X")
            .with_priority(priority)
            .with_duration(minutes)
    }

    #[test]
    fn test_distance_cost_is_leg() {
        let near = Objective::Distance.step_cost(&point(Priority::P3, 60), 1.0, 10.0, 45.0);
        let far = Objective::Distance.step_cost(&point(Priority::P1, 60), 2.0, 10.0, 45.0);
        assert!(near.beats(&far));
    }

    #[test]
    fn test_priority_outranks_distance() {
        let urgent_far = Objective::Priority.step_cost(&point(Priority::P1, 60), 50.0, 50.0, 45.0);
        let relaxed_near = Objective::Priority.step_cost(&point(Priority::P3, 60), 1.0, 50.0, 45.0);
        assert!(urgent_far.beats(&relaxed_near));
    }

    #[test]
    fn test_time_counts_visit_duration() {
        // 9 km at 45 km/h = 0.2h; a 30 min visit beats a 120 min one despite a longer leg
        let short_visit = Objective::Time.step_cost(&point(Priority::P2, 30), 9.0, 9.0, 45.0);
        let long_visit = Objective::Time.step_cost(&point(Priority::P2, 120), 4.5, 9.0, 45.0);
        assert!(short_visit.beats(&long_visit));
    }

    #[test]
    fn test_balanced_trades_distance_for_urgency() {
        // P1 at 8/10 of the max leg: 0.7 * 0.8 = 0.56
        // P3 at 5/10 of the max leg: 0.7 * 0.5 + 0.3 = 0.65
        let urgent = Objective::Balanced.step_cost(&point(Priority::P1, 60), 8.0, 10.0, 45.0);
        let relaxed = Objective::Balanced.step_cost(&point(Priority::P3, 60), 5.0, 10.0, 45.0);
        assert!(urgent.beats(&relaxed));
    }

    #[test]
    fn test_equal_costs_do_not_beat() {
        let a = Objective::Distance.step_cost(&point(Priority::P2, 60), 3.0, 3.0, 45.0);
        let b = Objective::Distance.step_cost(&point(Priority::P2, 60), 3.0, 3.0, 45.0);
        assert!(!a.beats(&b));
        assert!(!b.beats(&a));
    }

    #[test]
    fn test_objective_serde_names() {
        assert_eq!(serde_json::to_string(&Objective::Balanced).unwrap(), "\"balanced\"");
        assert_eq!(Objective::Priority.to_string(), "priority");
    }
}
