//! Test fixtures for visit-route-planner.
//!
//! Provides realistic test data including:
//! - Public bodies and service providers in the Itajaí region
//! - Builders turning fixture locations into visit points

pub mod itajai_region;

pub use itajai_region::*;
