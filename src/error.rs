//! Error type for corridor construction.

use thiserror::Error;

/// A hard failure that aborts corridor construction for the cycle.
///
/// A blocked corridor is not an error: blockage is reported through
/// [`PathBoundary::blocking_id`](crate::PathBoundary::blocking_id) on an
/// otherwise valid (trimmed) result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorridorError {
    #[error("reference line too short: {available:.2} m available, {required:.2} m required")]
    ReferenceLineTooShort { available: f64, required: f64 },

    #[error("planning start point cannot be projected onto the reference line")]
    UnprojectablePose,

    #[error("lane geometry unavailable at s = {s:.2}")]
    MissingLaneGeometry { s: f64 },

    #[error("road geometry unavailable at s = {s:.2}")]
    MissingRoadGeometry { s: f64 },

    #[error("ego position at s = {s:.2} lies beyond an obstacle bound and cannot be relaxed")]
    EgoOutsideObstacleBound { s: f64 },
}

pub type Result<T> = std::result::Result<T, CorridorError>;
