//! Candidate routes over the same points, one per objective.

use rayon::prelude::*;

use crate::objective::Objective;
use crate::route::Route;

/// Upper bound on requested alternatives.
pub const MAX_ALTERNATIVES: usize = 5;

/// Objectives used for `count` alternatives, in generation order.
///
/// Only four objectives exist, so at most four are returned.
pub fn objectives_for(count: usize) -> &'static [Objective] {
    let n = count.min(MAX_ALTERNATIVES).min(Objective::ALL.len());
    &Objective::ALL[..n]
}

/// Builds one candidate per objective in parallel, keeping objective order.
pub fn generate<F>(count: usize, build: F) -> Vec<Route>
where
    F: Fn(Objective) -> Route + Sync + Send,
{
    objectives_for(count)
        .par_iter()
        .map(|&objective| build(objective))
        .collect()
}
