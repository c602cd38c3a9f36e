//! Nearest-neighbor sequencing anchored at the base location.
//!
//! An approximation: it produces a usable route quickly, not a provably
//! shortest cycle. O(n²) in the number of points, which is fine for a
//! day's worth of visits.

use tracing::debug;

use crate::model::VisitPoint;
use crate::objective::{Objective, StepCost};

/// Location index of the base in a sequencing matrix.
pub const BASE_INDEX: usize = 0;

/// Orders points greedily under `objective`.
///
/// `matrix` is indexed as `[base, points...]`, so point `i` lives at
/// location `i + 1`. Returns indices into `points`. Each point appears
/// exactly once; ties go to the point that came first in the input.
pub fn sequence(
    points: &[VisitPoint],
    matrix: &[Vec<f64>],
    objective: Objective,
    speed_kmh: f64,
) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut order = Vec::with_capacity(points.len());
    let mut current = BASE_INDEX;

    while !remaining.is_empty() {
        let legs = &matrix[current];
        let max_leg_km = if objective.needs_max_leg() {
            remaining
                .iter()
                .map(|&i| legs[i + 1])
                .fold(0.0, f64::max)
        } else {
            0.0
        };

        let mut best_position = 0;
        let mut best_cost: Option<StepCost> = None;
        for (position, &i) in remaining.iter().enumerate() {
            let cost = objective.step_cost(&points[i], legs[i + 1], max_leg_km, speed_kmh);
            if best_cost.is_none_or(|best| cost.beats(&best)) {
                best_cost = Some(cost);
                best_position = position;
            }
        }

        let next = remaining.remove(best_position);
        order.push(next);
        current = next + 1;
    }

    debug!(objective = %objective, stops = order.len(), "sequenced route");
    order
}
