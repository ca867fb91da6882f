//! Collision detection: proximity classification, contact surfaces, and
//! contact-region computation.
//!
//! The pipeline runs in three stages per body pair:
//!
//! 1. [`GjkDetector`] classifies the pair (separate / contacting /
//!    intersecting) and, for contacting pairs, produces the separating
//!    plane and the simplex of support points it converged to.
//! 2. Each shape turns its side of the simplex into a [`ContactSurface`]
//!    (vertex, edge, or face) embedded in the separating plane.
//! 3. [`intersect_surfaces`] computes the actual contact point set for the
//!    surface pair, including 2D polygon clipping.

pub mod contact;
pub mod gjk;
pub mod intersect;
pub mod simplex;
pub mod surface;

pub use contact::ContactPoint;
pub use gjk::{ClosestPoints, GjkDetector, Proximity, SurfacePair};
pub use intersect::intersect_surfaces;
pub use simplex::{ContactSimplex, SupportPoint};
pub use surface::{ContactSurface, EdgeSurface, PointSurface, PolygonSurface, SurfaceKind};
