//! Error type shared by the collision and dynamics layers.

use thiserror::Error;

/// Errors surfaced by the collision and dynamics pipeline.
///
/// Geometric degeneracies (zero-length edges, coincident simplex points,
/// singular subsystems) are handled locally with conservative fallbacks and
/// never reach this type. What does reach it: broken invariants that mean a
/// contact pair cannot be processed this tick, and iterative solves that
/// exhausted their bounds. Callers are expected to log these and keep the
/// simulation running rather than abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TumbleError {
    /// A geometric invariant broke, e.g. a contact simplex with an
    /// unexpected number of vertices or no face adjacent to a simplex edge.
    #[error("geometry error: {0}")]
    Geometry(String),
    /// The engine was driven with an unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// An iterative solve exceeded its bound without converging.
    #[error("solver did not converge: {0}")]
    Divergence(String),
}
