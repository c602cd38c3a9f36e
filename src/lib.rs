//! visit-route-planner
//!
//! Route optimization and coverage analysis for field-research visits.
//! Sequences visits from a base location, spreads them over working days,
//! scores candidate routes under several objectives, and finds coverage
//! gaps and clusters among surveyed entities.
//!
//! Distances are great-circle (haversine) and travel time assumes a
//! constant average speed; no road network is consulted. Plug a different
//! [`traits::DistanceMatrixProvider`] into [`RouteEngine`] to change that.

pub mod alternatives;
pub mod analysis;
pub mod cluster;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod haversine;
pub mod model;
pub mod objective;
pub mod route;
pub mod sequencer;
pub mod traits;
pub mod weekly;

pub use config::EngineConfig;
pub use engine::RouteEngine;
pub use error::{EngineError, Result};
pub use model::{Coordinates, Priority, SurveyType, VisitPoint};
pub use objective::Objective;
pub use route::Route;
pub use weekly::{WeeklyOptions, WeeklyPlan};
