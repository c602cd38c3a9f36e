//! Error taxonomy for the planning engine.

use thiserror::Error;

/// Errors returned by the engine's boundary operations.
///
/// Degenerate geometry (coincident points, zero-length legs) is never an
/// error. Missing data surfaces as an empty result instead, see
/// [`crate::route::Route::is_empty`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("point {id} has invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { id: String, lat: f64, lng: f64 },

    #[error("point {id} must have a positive estimated duration")]
    NonPositiveDuration { id: String },

    #[error("priority must be 1, 2 or 3, got {0}")]
    InvalidPriority(u8),

    #[error("at least one working day is required")]
    NoWorkingDays,

    #[error("cell size must be a positive number of kilometres, got {0}")]
    InvalidCellSize(f64),

    #[error("radius must be a non-negative number of kilometres, got {0}")]
    InvalidRadius(f64),

    #[error("bounding box is inverted or not finite")]
    InvalidBounds,

    #[error("average speed must be positive, got {0} km/h")]
    InvalidSpeed(f64),

    #[error("plan date out of range: {0}")]
    DateOutOfRange(#[from] jiff::Error),

    #[error("point source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
